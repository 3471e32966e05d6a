// build.rs: build metadata for `sluice::build_info()`.
//
// Emits `SLUICE_BUILD_TARGET` (the target triple) and, when the builder sets
// `SLUICE_GIT_COMMIT` in the environment, forwards it together with the
// `sluice_git_commit` cfg so the library can report it.
fn main() {
    let target = std::env::var("TARGET").unwrap_or_default();
    println!("cargo:rustc-env=SLUICE_BUILD_TARGET={target}");

    println!("cargo:rerun-if-env-changed=SLUICE_GIT_COMMIT");
    if let Ok(commit) = std::env::var("SLUICE_GIT_COMMIT") {
        let commit = commit.trim();
        if !commit.is_empty() {
            println!("cargo:rustc-env=SLUICE_GIT_COMMIT={commit}");
            println!("cargo:rustc-cfg=sluice_git_commit");
        }
    }
}

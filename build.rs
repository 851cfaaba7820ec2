use std::error::Error;
use vergen_gitcl::{Emitter, GitclBuilder};

/// Environment override for the git description when no repository is available
const DESCRIBE_OVERRIDE: Option<&str> = option_env!("CUSTOM_VERGEN_GIT_DESCRIBE");

/// Emits the VERGEN_GIT_* instructions, including the describe string used in the version.
/// # Errors
/// * if `git` is not installed
/// * if there is no .git folder, e.g. when building from a source tarball
fn emit_git_describe() -> Result<(), Box<dyn Error>> {
    let gitcl = GitclBuilder::default()
        .all()
        .describe(false, true, Some("NoTagShouldEverMatchThisPattern"))
        .build()?;

    Emitter::default()
        .fail_on_error()
        .add_instructions(&gitcl)?
        .emit()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    if emit_git_describe().is_err() {
        // no git metadata, fall back to the override or "unknown"
        let describe = DESCRIBE_OVERRIDE.unwrap_or("unknown");
        println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE={describe}");
    }

    // vergen only tracks git state, so watch the manifest and sources explicitly
    for tracked in ["Cargo.toml", "src"] {
        println!("cargo:rerun-if-changed={tracked}");
    }

    Ok(())
}

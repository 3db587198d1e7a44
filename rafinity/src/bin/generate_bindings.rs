//! Generate UniFFI Swift and Kotlin bindings for RAFinity
//!
//! Run: cargo run --bin generate-bindings
//!
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │ DEPENDENCY MAP - Output paths must match the app projects                   │
//! │                                                                             │
//! │ Inputs:                                                                     │
//! │   <workspace>/target/release/librafinity.{dylib,so} ← Library for bindgen  │
//! │                                                                             │
//! │ Outputs:                                                                    │
//! │   ios/RafinityCore/rafinityFFI.h          ← C header                        │
//! │   ios/RafinityCore/module.modulemap       ← Clang module map                │
//! │   ios/RafinityCore/rafinity.swift         ← Swift bindings                  │
//! │   android/app/src/main/java/uniffi/...    ← Kotlin bindings                 │
//! └─────────────────────────────────────────────────────────────────────────────┘

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    let rust_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let project_root = rust_dir.parent().expect("No parent directory");

    println!("Building Rust library...");
    run_cmd("cargo", &["build", "--release"], &rust_dir);

    let library = release_library(project_root).to_string_lossy().into_owned();
    let generated = rust_dir.join("generated");

    for language in ["swift", "kotlin"] {
        println!("Generating {} bindings...", language);
        run_cmd(
            "cargo",
            &[
                "run",
                "--bin",
                "uniffi-bindgen",
                "generate",
                "--library",
                library.as_str(),
                "--language",
                language,
                "--out-dir",
                "generated",
            ],
            &rust_dir,
        );
    }

    // Swift 6 strict concurrency rejects the generated global
    let swift_dest = project_root.join("ios/RafinityCore");
    fs::create_dir_all(&swift_dest).expect("Create Swift output dir");
    let mut swift_content =
        fs::read_to_string(generated.join("rafinity.swift")).expect("Read swift file");
    swift_content = swift_content.replace(
        "private var initializationResult",
        "nonisolated(unsafe) private var initializationResult",
    );
    fs::write(swift_dest.join("rafinity.swift"), swift_content).expect("Write swift");

    fs::copy(generated.join("rafinityFFI.h"), swift_dest.join("rafinityFFI.h"))
        .expect("Copy header");

    println!("Writing modulemap...");
    fs::write(
        swift_dest.join("module.modulemap"),
        "module rafinityFFI {\n    header \"rafinityFFI.h\"\n    export *\n}\n",
    )
    .expect("Write modulemap");

    let kotlin_dest = project_root.join("android/app/src/main/java");
    copy_tree(&generated.join("uniffi"), &kotlin_dest.join("uniffi"));

    println!("Done! Bindings regenerated successfully.");
    println!("Generated files:");
    println!("  - {}/rafinity.swift", swift_dest.display());
    println!("  - {}/rafinityFFI.h", swift_dest.display());
    println!("  - {}/module.modulemap", swift_dest.display());
    println!("  - {}/uniffi/rafinity/rafinity.kt", kotlin_dest.display());
}

/// Cargo puts target/ at the workspace root, not in the member crate
fn release_library(workspace_root: &Path) -> PathBuf {
    let library_name = if cfg!(target_os = "macos") {
        "librafinity.dylib"
    } else {
        "librafinity.so"
    };
    workspace_root.join("target/release").join(library_name)
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("Create Kotlin output dir");
    for entry in fs::read_dir(from).expect("Read generated Kotlin dir") {
        let entry = entry.expect("Read dir entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("Copy Kotlin file");
        }
    }
}

fn run_cmd(program: &str, args: &[&str], dir: &PathBuf) {
    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap_or_else(|e| panic!("Failed to run {}: {}", program, e));

    if !status.success() {
        panic!("{} failed with status: {}", program, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_resolved_from_workspace_root() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let workspace_root = manifest_dir.parent().unwrap();
        let library = release_library(workspace_root);

        assert!(library.starts_with(workspace_root.join("target")));
        assert!(!library.starts_with(manifest_dir.join("target")));
        assert!(library.file_name().unwrap().to_string_lossy().starts_with("librafinity."));
    }
}

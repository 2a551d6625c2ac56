// build.rs
// Compiles the GLSL shaders to SPIR-V when the Vulkan SDK is available.
// Missing tools only produce warnings so headless builds keep working.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHADER_STAGES: [&str; 2] = ["vert", "frag"];

fn is_stale(source: &Path, output: &Path) -> bool {
    match (
        std::fs::metadata(source).and_then(|m| m.modified()),
        std::fs::metadata(output).and_then(|m| m.modified()),
    ) {
        (Ok(src), Ok(dst)) => src > dst,
        _ => true,
    }
}

fn compile_shaders(shader_dir: &Path, target_dir: &Path, glslc: &Path) -> usize {
    let entries = match std::fs::read_dir(shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            println!("cargo:warning=No shader directory found at {}", shader_dir.display());
            return 0;
        }
    };

    let mut compiled = 0;
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        let is_stage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| SHADER_STAGES.contains(&ext));
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_stage {
            continue;
        }

        // simple_shader.vert -> simple_shader.vert.spv
        let output = target_dir.join(format!("{file_name}.spv"));
        if !is_stale(&path, &output) {
            continue;
        }

        match Command::new(glslc).arg(&path).arg("-o").arg(&output).status() {
            Ok(status) if status.success() => compiled += 1,
            Ok(status) => println!(
                "cargo:warning=glslc failed for {file_name} with exit code {}",
                status.code().unwrap_or(-1)
            ),
            Err(e) => println!("cargo:warning=Failed to run glslc for {file_name}: {e}"),
        }
    }
    compiled
}

fn main() {
    println!("cargo:rerun-if-changed=resources/shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");
    println!("cargo:rerun-if-env-changed=SKIP_SHADERS");

    if env::var_os("SKIP_SHADERS").is_some() {
        return;
    }

    let Some(vulkan_sdk) = env::var_os("VULKAN_SDK") else {
        println!("cargo:warning=VULKAN_SDK not set, shader compilation skipped");
        return;
    };

    let glslc = if cfg!(target_os = "windows") {
        PathBuf::from(vulkan_sdk).join("Bin").join("glslc.exe")
    } else {
        PathBuf::from(vulkan_sdk).join("bin").join("glslc")
    };
    if !glslc.exists() {
        println!("cargo:warning=glslc not found at {}", glslc.display());
        return;
    }

    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let shader_dir = manifest_dir.join("resources/shaders");
    let target_dir = manifest_dir.join("../../target/shaders");
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        println!("cargo:warning=Failed to create {}: {e}", target_dir.display());
        return;
    }

    let compiled = compile_shaders(&shader_dir, &target_dir, &glslc);
    if compiled > 0 {
        println!("cargo:warning=Compiled {compiled} shader(s) into {}", target_dir.display());
    }
}

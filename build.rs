use std::env;
use std::path::{Path, PathBuf};

/// Directory holding the FFmpeg shared libraries on Windows.
const DLL_DIR_VAR: &str = "FFMPEG_DLL_DIR";
const DEFAULT_DLL_DIR: &str = "third_party/ffmpeg/bin";

/// Libraries behind the demuxer, decoders, scaler and resampler.
const LIBRARIES: &[&str] = &["avcodec", "avformat", "avutil", "swresample", "swscale"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed={}", DLL_DIR_VAR);

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }

    let dll_dir = env::var_os(DLL_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DLL_DIR));
    println!("cargo:rerun-if-changed={}", dll_dir.display());

    if !dll_dir.is_dir() {
        println!(
            "cargo:warning=FFmpeg DLLs not found in {}, set {} to their directory",
            dll_dir.display(),
            DLL_DIR_VAR
        );
        return;
    }
    println!("cargo:rustc-link-search=native={}", dll_dir.display());

    let Some(profile_dir) = profile_dir() else {
        println!("cargo:warning=unable to locate the target directory, FFmpeg DLLs not copied");
        return;
    };

    match stage_libraries(&dll_dir, &profile_dir) {
        Ok(0) => println!("cargo:warning=no FFmpeg DLLs in {}", dll_dir.display()),
        Ok(_) => {}
        Err(e) => panic!("failed to stage FFmpeg DLLs from {}: {}", dll_dir.display(), e),
    }
}

/// `target/<profile>`, the directory the binary lands in.
fn profile_dir() -> Option<PathBuf> {
    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out
    let out_dir = PathBuf::from(env::var_os("OUT_DIR")?);
    out_dir.ancestors().nth(3).map(Path::to_path_buf)
}

/// Copy every FFmpeg DLL that is missing or stale in `dest`.
/// Returns how many DLLs were found.
fn stage_libraries(dll_dir: &Path, dest: &Path) -> std::io::Result<usize> {
    let mut found = 0;
    for entry in std::fs::read_dir(dll_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_ffmpeg_dll(name) {
            continue;
        }
        found += 1;

        let target = dest.join(name);
        if is_stale(&path, &target) {
            std::fs::copy(&path, &target)?;
        }
    }
    Ok(found)
}

/// `avcodec-61.dll` and the like.
fn is_ffmpeg_dll(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let Some(stem) = lower.strip_suffix(".dll") else {
        return false;
    };
    LIBRARIES.iter().any(|lib| {
        stem.strip_prefix(lib)
            .is_some_and(|rest| rest.starts_with('-'))
    })
}

fn is_stale(source: &Path, target: &Path) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(source), modified(target)) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

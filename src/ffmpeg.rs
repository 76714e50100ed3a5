//! FFmpeg library version reporting
//!
//! `ac-ffmpeg` links libavutil, libavcodec and libavformat but does not
//! expose their version queries, so the few symbols needed are declared here.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_uint};

unsafe extern "C" {
    fn av_version_info() -> *const c_char;
    fn avcodec_configuration() -> *const c_char;
    safe fn avutil_version() -> c_uint;
    safe fn avcodec_version() -> c_uint;
    safe fn avformat_version() -> c_uint;
}

/// A packed `AV_VERSION_INT` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibVersion(pub u32);

impl LibVersion {
    pub fn major(self) -> u32 {
        self.0 >> 16
    }

    pub fn minor(self) -> u32 {
        (self.0 >> 8) & 0xff
    }

    pub fn micro(self) -> u32 {
        self.0 & 0xff
    }
}

impl fmt::Display for LibVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.micro())
    }
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: String,
    pub configuration: String,
    pub avutil: LibVersion,
    pub avcodec: LibVersion,
    pub avformat: LibVersion,
}

impl VersionInfo {
    pub fn query() -> Self {
        VersionInfo {
            // SAFETY: both return pointers to static NUL-terminated strings
            version: unsafe { static_str(av_version_info()) },
            configuration: unsafe { static_str(avcodec_configuration()) },
            avutil: LibVersion(avutil_version()),
            avcodec: LibVersion(avcodec_version()),
            avformat: LibVersion(avformat_version()),
        }
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "av_version_info:{}", self.version)?;
        writeln!(f, "avcodec_configuration:{}", self.configuration)?;
        writeln!(f, "libavutil:{}", self.avutil)?;
        writeln!(f, "libavcodec:{}", self.avcodec)?;
        write!(f, "libavformat:{}", self.avformat)
    }
}

unsafe fn static_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::from("unknown");
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lib_version_unpack() {
        // AV_VERSION_INT(60, 31, 102)
        let v = LibVersion((60 << 16) | (31 << 8) | 102);
        assert_eq!(v.major(), 60);
        assert_eq!(v.minor(), 31);
        assert_eq!(v.micro(), 102);
        assert_eq!(v.to_string(), "60.31.102");
    }

    #[test]
    fn test_version_report_lines() {
        let info = VersionInfo {
            version: String::from("7.1"),
            configuration: String::from("--enable-gpl"),
            avutil: LibVersion(59 << 16),
            avcodec: LibVersion(61 << 16),
            avformat: LibVersion(61 << 16),
        };
        let report = info.to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "av_version_info:7.1");
        assert_eq!(lines[1], "avcodec_configuration:--enable-gpl");
        assert_eq!(lines.len(), 5);
    }
}

use serde::{Deserialize, Serialize};

/// Target platform of a build invocation.
///
/// Drives the path-list separator, library file name patterns and the
/// versioned runtime-library naming scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn path_list_separator(self) -> char {
        match self {
            Platform::Windows => ';',
            Platform::Linux | Platform::Macos => ':',
        }
    }

    /// Glob patterns (relative to a library directory) matching library
    /// artifacts for `stem`. A `*` stem matches any library.
    pub fn library_patterns(self, stem: &str) -> Vec<String> {
        match self {
            Platform::Linux => vec![
                format!("lib{stem}.so"),
                format!("lib{stem}.so.*"),
                format!("lib{stem}.a"),
            ],
            Platform::Macos => vec![format!("lib{stem}.dylib"), format!("lib{stem}.a")],
            Platform::Windows => vec![format!("{stem}.lib"), format!("{stem}.dll")],
        }
    }

    /// Rewrite a shared-library file name so it carries `version`.
    ///
    /// `libcrypto.so` -> `libcrypto.so.1.1` on Linux,
    /// `libcrypto.dylib` -> `libcrypto.1.1.dylib` on macOS,
    /// `libcrypto.dll` -> `libcrypto-1_1.dll` on Windows.
    /// Names that are not shared libraries for the platform are returned unchanged.
    pub fn versioned_library_name(self, file_name: &str, version: &str) -> String {
        match self {
            Platform::Linux => {
                if file_name.ends_with(".so") {
                    format!("{file_name}.{version}")
                } else {
                    file_name.to_string()
                }
            }
            Platform::Macos => match file_name.strip_suffix(".dylib") {
                Some(stem) => format!("{stem}.{version}.dylib"),
                None => file_name.to_string(),
            },
            Platform::Windows => match file_name.strip_suffix(".dll") {
                Some(stem) => format!("{stem}-{}.dll", version.replace('.', "_")),
                None => file_name.to_string(),
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Macos),
            "windows" => Ok(Platform::Windows),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

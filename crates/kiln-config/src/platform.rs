//! Platforms, compilers, and build flavors
//!
//! Provides the built-in configuration layers: the common defaults shared by
//! every platform, one profile per supported platform/compiler pair, and one
//! overlay per build flavor.

use crate::layer::{ConfigLayer, PatternLayer, RoleLayer};
use crate::options::OptionSet;
use crate::{ConfigError, ConfigResult, Role};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    FreeBsd,
    Windows,
}

impl Platform {
    /// All known platforms
    pub fn all() -> [Platform; 4] {
        [Self::Linux, Self::Darwin, Self::FreeBsd, Self::Windows]
    }

    /// Platform of the running host
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::Darwin
        } else if cfg!(target_os = "freebsd") {
            Self::FreeBsd
        } else {
            Self::Linux
        }
    }

    /// Platform name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::FreeBsd => "freebsd",
            Self::Windows => "windows",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Whether the conventional install prefix is `/usr/local`
    pub fn uses_usr_local(&self) -> bool {
        matches!(self, Self::Linux | Self::FreeBsd | Self::Darwin)
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "darwin" | "macos" => Ok(Self::Darwin),
            "freebsd" => Ok(Self::FreeBsd),
            "windows" | "win32" => Ok(Self::Windows),
            other => Err(ConfigError::InvalidValue {
                field: "platform".to_string(),
                reason: format!("unknown platform '{}' (expected linux, darwin, freebsd, windows)", other),
            }),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Compiler family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compiler {
    #[serde(rename = "clang")]
    Clang,
    #[serde(rename = "gcc")]
    Gcc,
    /// clang-cl with the MSVC-compatible driver and lld-link
    #[serde(rename = "clang-cl")]
    ClangCl,
}

impl Compiler {
    /// Compiler name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Clang => "clang",
            Self::Gcc => "gcc",
            Self::ClangCl => "clang-cl",
        }
    }

    /// Default compiler for a platform
    pub fn default_for(platform: Platform) -> Self {
        match platform {
            Platform::Windows => Self::ClangCl,
            _ => Self::Clang,
        }
    }

    /// Whether the compiler takes MSVC-style switches
    pub fn is_msvc_style(&self) -> bool {
        matches!(self, Self::ClangCl)
    }
}

impl FromStr for Compiler {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clang" => Ok(Self::Clang),
            "gcc" | "mingw" => Ok(Self::Gcc),
            "clang-cl" | "msvc" => Ok(Self::ClangCl),
            other => Err(ConfigError::InvalidValue {
                field: "compiler".to_string(),
                reason: format!("unknown compiler '{}' (expected clang, gcc, clang-cl)", other),
            }),
        }
    }
}

impl std::fmt::Display for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Unoptimized with debug info (default)
    Debug,
    /// Lightly optimized with debug info
    DebugOptimized,
    /// Optimized
    Release,
    /// Optimized for size
    MinSize,
}

impl Flavor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::DebugOptimized => "debugoptimized",
            Self::Release => "release",
            Self::MinSize => "minsize",
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Self::Debug | Self::DebugOptimized)
    }
}

#[allow(clippy::derivable_impls)]
impl Default for Flavor {
    fn default() -> Self {
        Self::Debug
    }
}

impl FromStr for Flavor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "debugoptimized" => Ok(Self::DebugOptimized),
            "release" => Ok(Self::Release),
            "minsize" => Ok(Self::MinSize),
            other => Err(ConfigError::InvalidValue {
                field: "flavor".to_string(),
                reason: format!(
                    "unknown flavor '{}' (expected debug, debugoptimized, release, minsize)",
                    other
                ),
            }),
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const GNU_COMPILE: &str = "${PROGRAM} ${FLAGS} ${CPPFLAGS} ${DEFINES} ${INCLUDES} -c ${SRC} -o ${OUT}";
const GNU_ARCHIVE: &str = "${PROGRAM} rcs ${OUT} ${OBJS}";
const GNU_SHARED: &str = "${PROGRAM} -shared ${LDFLAGS} -o ${OUT} ${OBJS} ${LIBPATHS} ${LIBS}";
const GNU_PROGRAM: &str = "${PROGRAM} ${LDFLAGS} -o ${OUT} ${OBJS} ${LIBPATHS} ${LIBS}";

const WINDOWS_DEFINES: &[&str] = &[
    "UNICODE",
    "_UNICODE",
    "WIN32_LEAN_AND_MEAN",
    "WINVER=0x0A00",
    "_WIN32_WINNT=0x0A00",
    "_CRT_SECURE_NO_DEPRECATE",
    "_SCL_SECURE_NO_DEPRECATE",
];

const WINDOWS_LIBS: &[&str] = &[
    "kernel32", "user32", "gdi32", "winspool", "shell32", "ole32", "oleaut32", "uuid",
    "comdlg32", "advapi32",
];

fn pattern(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Defaults shared by every platform: GNU-style templates and patterns
pub fn common_defaults() -> ConfigLayer {
    let compile = RoleLayer {
        template: Some(GNU_COMPILE.to_string()),
        options: OptionSet::new().with_includes(["."]),
        ..Default::default()
    };

    ConfigLayer::new()
        .with_role(Role::Cc, compile.clone())
        .with_role(Role::Cxx, compile)
        .with_role(
            Role::Ar,
            RoleLayer {
                template: Some(GNU_ARCHIVE.to_string()),
                ..Default::default()
            },
        )
        .with_role(
            Role::Shlink,
            RoleLayer {
                template: Some(GNU_SHARED.to_string()),
                ..Default::default()
            },
        )
        .with_role(
            Role::Link,
            RoleLayer {
                template: Some(GNU_PROGRAM.to_string()),
                ..Default::default()
            },
        )
        .with_patterns(PatternLayer {
            static_lib: pattern("lib${NAME}.a"),
            shared_lib: pattern("lib${NAME}.so"),
            shared_lib_versioned: pattern("lib${NAME}.so.${VERSION}"),
            import_lib: pattern(""),
            program: pattern("${NAME}"),
            object_ext: pattern("o"),
            object_glob: pattern("*.o"),
            define: pattern("-D${VALUE}"),
            include: pattern("-I${VALUE}"),
            lib: pattern("-l${VALUE}"),
            lib_path: pattern("-L${VALUE}"),
        })
}

fn unix_tools(cc: &str, cxx: &str) -> ConfigLayer {
    let pic = OptionSet::new().with_flags(["-fPIC"]);
    ConfigLayer::new()
        .with_role(
            Role::Cc,
            RoleLayer {
                program: Some(cc.to_string()),
                options: pic.clone(),
                ..Default::default()
            },
        )
        .with_role(
            Role::Cxx,
            RoleLayer {
                program: Some(cxx.to_string()),
                options: pic,
                ..Default::default()
            },
        )
        .with_role(
            Role::Ar,
            RoleLayer {
                program: Some("ar".to_string()),
                ..Default::default()
            },
        )
        .with_role(
            Role::Shlink,
            RoleLayer {
                program: Some(cxx.to_string()),
                ..Default::default()
            },
        )
        .with_role(
            Role::Link,
            RoleLayer {
                program: Some(cxx.to_string()),
                ..Default::default()
            },
        )
}

fn windows_compile_options() -> OptionSet {
    OptionSet::new().with_defines(WINDOWS_DEFINES.iter().copied())
}

/// Profile layer for a platform/compiler pair
pub fn profile_layer(platform: Platform, compiler: Compiler) -> ConfigResult<ConfigLayer> {
    let layer = match (platform, compiler) {
        (Platform::Linux | Platform::FreeBsd, Compiler::Clang) => unix_tools("clang", "clang++"),
        (Platform::Linux | Platform::FreeBsd, Compiler::Gcc) => unix_tools("gcc", "g++"),
        (Platform::Darwin, Compiler::Clang) => ConfigLayer::new()
            .with_role(Role::Cc, RoleLayer::tool("clang", GNU_COMPILE))
            .with_role(Role::Cxx, RoleLayer::tool("clang++", GNU_COMPILE))
            .with_role(
                Role::Ar,
                RoleLayer::tool("libtool", "${PROGRAM} -static -o ${OUT} ${OBJS}"),
            )
            .with_role(
                Role::Shlink,
                RoleLayer::tool(
                    "clang++",
                    "${PROGRAM} -dynamiclib ${LDFLAGS} -o ${OUT} ${OBJS} ${LIBPATHS} ${LIBS}",
                ),
            )
            .with_role(Role::Link, RoleLayer::tool("clang++", GNU_PROGRAM))
            .with_patterns(PatternLayer {
                shared_lib: pattern("lib${NAME}.dylib"),
                shared_lib_versioned: pattern("lib${NAME}.${VERSION}.dylib"),
                ..Default::default()
            }),
        (Platform::Windows, Compiler::ClangCl) => {
            let compile =
                "${PROGRAM} -nologo ${FLAGS} ${CPPFLAGS} ${DEFINES} ${INCLUDES} -c ${SRC} -Fo${OUT}";
            ConfigLayer::new()
                .with_role(
                    Role::Cc,
                    RoleLayer {
                        options: windows_compile_options(),
                        ..RoleLayer::tool("clang-cl.exe", compile)
                    },
                )
                .with_role(
                    Role::Cxx,
                    RoleLayer {
                        options: windows_compile_options().with_flags(["-EHsc", "-GR"]),
                        ..RoleLayer::tool("clang-cl.exe", compile)
                    },
                )
                .with_role(
                    Role::Ar,
                    RoleLayer::tool("llvm-lib.exe", "${PROGRAM} -nologo -out:${OUT} ${OBJS}"),
                )
                .with_role(
                    Role::Shlink,
                    RoleLayer::tool(
                        "lld-link.exe",
                        "${PROGRAM} -nologo -dll -out:${OUT} -implib:${IMPLIB} ${LDFLAGS} ${LIBPATHS} ${OBJS} ${LIBS}",
                    )
                    .with_std_libs(WINDOWS_LIBS.iter().copied()),
                )
                .with_role(
                    Role::Link,
                    RoleLayer::tool(
                        "lld-link.exe",
                        "${PROGRAM} -nologo -out:${OUT} ${LDFLAGS} ${LIBPATHS} ${OBJS} ${LIBS}",
                    )
                    .with_std_libs(WINDOWS_LIBS.iter().copied()),
                )
                .with_patterns(PatternLayer {
                    static_lib: pattern("lib${NAME}.lib"),
                    shared_lib: pattern("lib${NAME}.dll"),
                    shared_lib_versioned: pattern(""),
                    import_lib: pattern("lib${NAME}.dll.lib"),
                    program: pattern("${NAME}.exe"),
                    object_ext: pattern("obj"),
                    object_glob: pattern("*.obj"),
                    lib: pattern("${VALUE}.lib"),
                    lib_path: pattern("-libpath:${VALUE}"),
                    ..Default::default()
                })
        }
        (Platform::Windows, Compiler::Gcc) => ConfigLayer::new()
            .with_role(
                Role::Cc,
                RoleLayer {
                    options: windows_compile_options(),
                    ..RoleLayer::tool("gcc.exe", GNU_COMPILE)
                },
            )
            .with_role(
                Role::Cxx,
                RoleLayer {
                    options: windows_compile_options(),
                    ..RoleLayer::tool("g++.exe", GNU_COMPILE)
                },
            )
            .with_role(Role::Ar, RoleLayer::tool("ar.exe", GNU_ARCHIVE))
            .with_role(
                Role::Shlink,
                RoleLayer::tool(
                    "g++.exe",
                    "${PROGRAM} -shared ${LDFLAGS} -o ${OUT} -Wl,--out-implib,${IMPLIB} ${OBJS} ${LIBPATHS} ${LIBS}",
                )
                .with_std_libs(WINDOWS_LIBS.iter().copied()),
            )
            .with_role(
                Role::Link,
                RoleLayer::tool("g++.exe", GNU_PROGRAM).with_std_libs(WINDOWS_LIBS.iter().copied()),
            )
            .with_patterns(PatternLayer {
                shared_lib: pattern("lib${NAME}.dll"),
                shared_lib_versioned: pattern("lib${NAME}-${VERSION}.dll"),
                import_lib: pattern("lib${NAME}.dll.a"),
                program: pattern("${NAME}.exe"),
                ..Default::default()
            }),
        (platform, compiler) => {
            return Err(ConfigError::UnsupportedProfile {
                platform: platform.to_string(),
                compiler: compiler.to_string(),
            })
        }
    };

    Ok(layer)
}

/// Flavor overlay for a compiler family
pub fn flavor_layer(flavor: Flavor, compiler: Compiler) -> ConfigLayer {
    let (cflags, defines, ldflags): (&[&str], &str, &[&str]) = if compiler.is_msvc_style() {
        match flavor {
            Flavor::Debug => (&["-MDd", "-Zi"], "DEBUG", &["-debug"]),
            Flavor::DebugOptimized => (&["-MD", "-Zi", "-O2"], "DEBUG", &["-debug"]),
            Flavor::Release => (&["-MD", "-O2"], "NDEBUG", &[]),
            Flavor::MinSize => (&["-MD", "-Os"], "NDEBUG", &[]),
        }
    } else {
        match flavor {
            Flavor::Debug => (&["-O0", "-g"], "DEBUG", &[]),
            Flavor::DebugOptimized => (&["-O1", "-g"], "DEBUG", &[]),
            Flavor::Release => (&["-O2"], "NDEBUG", &[]),
            Flavor::MinSize => (&["-Os"], "NDEBUG", &[]),
        }
    };

    let (warnings, cxx_extra): (&[&str], &[&str]) = if compiler.is_msvc_style() {
        (&["-W1"], &["-std:c++14"])
    } else {
        (&["-Wall", "-Wshadow", "-Wundef"], &["-Wnon-virtual-dtor", "-std=c++14"])
    };

    let c_options = OptionSet::new()
        .with_flags(warnings.iter().chain(cflags).copied())
        .with_defines([defines]);
    let cxx_options = c_options.clone().with_flags(cxx_extra.iter().copied());
    let link_options = OptionSet::new().with_ldflags(ldflags.iter().copied());

    ConfigLayer::new()
        .with_role(Role::Cc, RoleLayer::with_options(c_options))
        .with_role(Role::Cxx, RoleLayer::with_options(cxx_options))
        .with_role(Role::Shlink, RoleLayer::with_options(link_options.clone()))
        .with_role(Role::Link, RoleLayer::with_options(link_options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("linux", Platform::Linux)]
    #[case("macos", Platform::Darwin)]
    #[case("FreeBSD", Platform::FreeBsd)]
    #[case("win32", Platform::Windows)]
    fn test_platform_from_str(#[case] input: &str, #[case] expected: Platform) {
        assert_eq!(input.parse::<Platform>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_platform() {
        assert!("beos".parse::<Platform>().is_err());
    }

    #[rstest]
    #[case("clang", Compiler::Clang)]
    #[case("gcc", Compiler::Gcc)]
    #[case("mingw", Compiler::Gcc)]
    #[case("msvc", Compiler::ClangCl)]
    #[case("clang-cl", Compiler::ClangCl)]
    fn test_compiler_from_str(#[case] input: &str, #[case] expected: Compiler) {
        assert_eq!(input.parse::<Compiler>().unwrap(), expected);
    }

    #[test]
    fn test_flavor_from_str() {
        assert_eq!("release".parse::<Flavor>().unwrap(), Flavor::Release);
        assert_eq!("DebugOptimized".parse::<Flavor>().unwrap(), Flavor::DebugOptimized);
        assert!("fast".parse::<Flavor>().is_err());
        assert_eq!(Flavor::default(), Flavor::Debug);
    }

    #[test]
    fn test_every_platform_has_a_default_compiler_profile() {
        for platform in Platform::all() {
            let compiler = Compiler::default_for(platform);
            assert!(profile_layer(platform, compiler).is_ok(), "{}", platform);
        }
    }

    #[test]
    fn test_unsupported_profile() {
        let err = profile_layer(Platform::Linux, Compiler::ClangCl).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProfile { .. }));
        assert!(profile_layer(Platform::Darwin, Compiler::Gcc).is_err());
    }

    #[test]
    fn test_release_overlay_defines_ndebug() {
        let layer = flavor_layer(Flavor::Release, Compiler::Clang);
        assert_eq!(layer.cc.options.defines, vec!["NDEBUG"]);
        assert!(layer.cc.options.flags.contains(&"-O2".to_string()));
        assert!(layer.cxx.options.flags.contains(&"-std=c++14".to_string()));
        assert!(!layer.cc.options.flags.contains(&"-std=c++14".to_string()));
    }

    #[test]
    fn test_msvc_debug_overlay_links_debug_info() {
        let layer = flavor_layer(Flavor::Debug, Compiler::ClangCl);
        assert_eq!(layer.link.options.ldflags, vec!["-debug"]);
        assert_eq!(layer.cc.options.flags, vec!["-W1", "-MDd", "-Zi"]);
    }

    #[test]
    fn test_windows_profile_links_system_libraries() {
        let layer = profile_layer(Platform::Windows, Compiler::ClangCl).unwrap();
        assert!(layer.link.std_libs.contains(&"kernel32".to_string()));
        assert!(layer.ar.std_libs.is_empty());
    }
}

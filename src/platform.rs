//! Target platform ABI profiles.
//!
//! A [`PlatformProfile`] records the data layout the analysed code is
//! compiled for: the byte width of every primitive type, the signedness of
//! plain `char`, and the number of bits per byte. The analysis host's own
//! layout is irrelevant except for the [`PlatformType::Native`] and
//! [`PlatformType::Unspecified`] profiles, which copy it.
//!
//! Profiles come from a compiled-in table ([`PlatformProfile::builtin`]) and
//! can be overridden field by field from an XML profile document:
//!
//! ```xml
//! <platform>
//!   <default-sign>u</default-sign>
//!   <char_bit>8</char_bit>
//!   <sizeof>
//!     <int>2</int>
//!     <pointer>2</pointer>
//!   </sizeof>
//! </platform>
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ImportError, Result, read_file};

// ═══════════════════════════════════════════════════════════════════════════════
//  Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// Identity of a platform profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlatformType {
    /// Host primitive sizes, `char` signedness left open.
    Unspecified,
    /// Host primitive sizes and host `char` signedness.
    Native,
    /// 32-bit Windows, ANSI character set.
    Win32A,
    /// 32-bit Windows, wide character set.
    Win32W,
    /// 64-bit Windows (LLP64).
    Win64,
    /// 32-bit Unix-like (ILP32).
    Unix32,
    /// 64-bit Unix-like (LP64).
    Unix64,
    /// Loaded from a profile document; has no table entry.
    Custom,
}

impl PlatformType {
    /// Every type that [`PlatformProfile::builtin`] knows.
    pub const BUILTIN: [PlatformType; 7] = [
        Self::Unspecified,
        Self::Native,
        Self::Win32A,
        Self::Win32W,
        Self::Win64,
        Self::Unix32,
        Self::Unix64,
    ];

    /// The profile matching the machine this crate was built for.
    pub fn host() -> Self {
        if cfg!(all(windows, target_pointer_width = "64")) {
            Self::Win64
        } else if cfg!(windows) {
            Self::Win32A
        } else {
            Self::Native
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Native => "native",
            Self::Win32A => "win32A",
            Self::Win32W => "win32W",
            Self::Win64 => "win64",
            Self::Unix32 => "unix32",
            Self::Unix64 => "unix64",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlatformType {
    type Err = ImportError;

    /// Accepts the name of a built-in profile, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        Self::BUILTIN
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ImportError::UnsupportedPlatform(s.to_string()))
    }
}

/// Signedness of plain `char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DefaultSign {
    Signed,
    Unsigned,
    Unspecified,
}

impl DefaultSign {
    /// Sign of `char` on the host.
    fn host() -> Self {
        if std::ffi::c_char::MIN == 0 {
            Self::Unsigned
        } else {
            Self::Signed
        }
    }

    /// Decode the `default-sign` element text (`s` or `u`).
    fn from_text(text: &str) -> Self {
        match text.chars().next() {
            Some('s' | 'S') => Self::Signed,
            Some('u' | 'U') => Self::Unsigned,
            _ => Self::Unspecified,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Profile
// ═══════════════════════════════════════════════════════════════════════════════

/// Primitive type layout of a target platform.
///
/// Bit widths are derived from [`char_bit`](Self::char_bit) and the byte
/// widths on demand, so they can never drift from the sizes they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub platform_type: PlatformType,
    pub sizeof_bool: u32,
    pub sizeof_short: u32,
    pub sizeof_int: u32,
    pub sizeof_long: u32,
    pub sizeof_long_long: u32,
    pub sizeof_float: u32,
    pub sizeof_double: u32,
    pub sizeof_long_double: u32,
    pub sizeof_wchar_t: u32,
    pub sizeof_size_t: u32,
    pub sizeof_pointer: u32,
    pub default_sign: DefaultSign,
    pub char_bit: u32,
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::host()
    }
}

/// `long double` width on the host. Rust has no such type, so this follows
/// the C ABI of the target this crate is built for.
const fn host_long_double() -> u32 {
    if cfg!(any(
        target_env = "msvc",
        target_arch = "arm",
        all(target_vendor = "apple", target_arch = "aarch64"),
    )) {
        8
    } else if cfg!(target_arch = "x86") {
        12
    } else {
        16
    }
}

const fn host_wchar_t() -> u32 {
    if cfg!(windows) { 2 } else { 4 }
}

impl PlatformProfile {
    /// Profile of the machine this crate was built for.
    pub fn host() -> Self {
        Self::builtin(PlatformType::host()).unwrap_or_else(|| Self::host_layout(DefaultSign::host()))
    }

    fn host_layout(default_sign: DefaultSign) -> Self {
        use std::ffi::{c_int, c_long, c_longlong, c_short};
        use std::mem::size_of;

        Self {
            platform_type: PlatformType::Native,
            sizeof_bool: size_of::<bool>() as u32,
            sizeof_short: size_of::<c_short>() as u32,
            sizeof_int: size_of::<c_int>() as u32,
            sizeof_long: size_of::<c_long>() as u32,
            sizeof_long_long: size_of::<c_longlong>() as u32,
            sizeof_float: size_of::<f32>() as u32,
            sizeof_double: size_of::<f64>() as u32,
            sizeof_long_double: host_long_double(),
            sizeof_wchar_t: host_wchar_t(),
            sizeof_size_t: size_of::<usize>() as u32,
            sizeof_pointer: size_of::<*const ()>() as u32,
            default_sign,
            char_bit: 8,
        }
    }

    /// Fixed-layout profile shared by the Windows and Unix table entries.
    fn fixed(
        platform_type: PlatformType,
        sizeof_long: u32,
        sizeof_long_double: u32,
        sizeof_wchar_t: u32,
        sizeof_size_t: u32,
        sizeof_pointer: u32,
    ) -> Self {
        Self {
            platform_type,
            sizeof_bool: 1,
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long,
            sizeof_long_long: 8,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_long_double,
            sizeof_wchar_t,
            sizeof_size_t,
            sizeof_pointer,
            default_sign: DefaultSign::Unspecified,
            char_bit: 8,
        }
    }

    /// Compiled-in profile for `platform_type`. `None` for
    /// [`PlatformType::Custom`], which only exists through a document.
    pub fn builtin(platform_type: PlatformType) -> Option<Self> {
        let profile = match platform_type {
            PlatformType::Unspecified => Self {
                platform_type,
                ..Self::host_layout(DefaultSign::Unspecified)
            },
            PlatformType::Native => Self::host_layout(DefaultSign::host()),
            PlatformType::Win32A | PlatformType::Win32W => {
                Self::fixed(platform_type, 4, 8, 2, 4, 4)
            }
            PlatformType::Win64 => Self::fixed(platform_type, 4, 8, 2, 8, 8),
            PlatformType::Unix32 => Self::fixed(platform_type, 4, 12, 4, 4, 4),
            PlatformType::Unix64 => Self::fixed(platform_type, 8, 16, 4, 8, 8),
            PlatformType::Custom => return None,
        };
        Some(profile)
    }

    // ─── Derived widths ──────────────────────────────────────────────────

    pub fn short_bit(&self) -> u32 {
        self.char_bit.saturating_mul(self.sizeof_short)
    }

    pub fn int_bit(&self) -> u32 {
        self.char_bit.saturating_mul(self.sizeof_int)
    }

    pub fn long_bit(&self) -> u32 {
        self.char_bit.saturating_mul(self.sizeof_long)
    }

    pub fn long_long_bit(&self) -> u32 {
        self.char_bit.saturating_mul(self.sizeof_long_long)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace this profile with the built-in one of the given type.
    ///
    /// Fails with [`ImportError::UnsupportedPlatform`] for
    /// [`PlatformType::Custom`]; the profile is left unchanged.
    pub fn select_type(&mut self, platform_type: PlatformType) -> Result<()> {
        let profile = Self::builtin(platform_type)
            .ok_or_else(|| ImportError::UnsupportedPlatform(platform_type.to_string()))?;
        *self = profile;
        Ok(())
    }

    /// Replace this profile with the built-in one called `name`
    /// (`win32A`, `unix64`, …).
    ///
    /// Unknown names fail with [`ImportError::UnsupportedPlatform`] and leave
    /// the profile unchanged.
    pub fn select(&mut self, name: &str) -> Result<()> {
        let platform_type = name.parse::<PlatformType>()?;
        self.select_type(platform_type)
    }

    // ─── Profile documents ───────────────────────────────────────────────

    /// Override fields from the profile document at `path`.
    pub fn load_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let source = read_file(path)?;
        self.load_str(&source)?;
        log::debug!("loaded platform profile from {}", path.display());
        Ok(())
    }

    /// Override fields from a profile document held in memory.
    ///
    /// Only the elements present in the document are applied. On any error
    /// the profile is left exactly as it was.
    pub fn load_str(&mut self, source: &str) -> Result<()> {
        let doc = roxmltree::Document::parse(source)?;
        let root = doc.root_element();
        if root.tag_name().name() != "platform" {
            return Err(ImportError::malformed(format!(
                "expected root element <platform>, found <{}>",
                root.tag_name().name()
            )));
        }

        let mut profile = self.clone();
        for node in root.children().filter(|n| n.is_element()) {
            let text = node.text().unwrap_or("").trim();
            match node.tag_name().name() {
                "default-sign" => profile.default_sign = DefaultSign::from_text(text),
                "char_bit" => profile.char_bit = parse_width("char_bit", text)?,
                "sizeof" => {
                    for size in node.children().filter(|n| n.is_element()) {
                        let tag = size.tag_name().name();
                        let Some(field) = profile.sizeof_field(tag) else {
                            log::debug!("ignoring unknown <sizeof> entry <{tag}>");
                            continue;
                        };
                        *field = parse_width(tag, size.text().unwrap_or("").trim())?;
                    }
                }
                other => log::debug!("ignoring unknown platform element <{other}>"),
            }
        }

        profile.check_bit_widths()?;
        profile.platform_type = PlatformType::Custom;
        *self = profile;
        Ok(())
    }

    /// Every derived bit width must fit in a `u32`.
    fn check_bit_widths(&self) -> Result<()> {
        let widths = [
            ("short", self.sizeof_short),
            ("int", self.sizeof_int),
            ("long", self.sizeof_long),
            ("long-long", self.sizeof_long_long),
        ];
        for (tag, size) in widths {
            if self.char_bit.checked_mul(size).is_none() {
                return Err(ImportError::malformed(format!(
                    "char_bit {} times sizeof {tag} {size} overflows",
                    self.char_bit
                )));
            }
        }
        Ok(())
    }

    /// Field named by a `<sizeof>` child element.
    fn sizeof_field(&mut self, tag: &str) -> Option<&mut u32> {
        let field = match tag {
            "short" => &mut self.sizeof_short,
            "int" => &mut self.sizeof_int,
            "long" => &mut self.sizeof_long,
            "long-long" => &mut self.sizeof_long_long,
            "float" => &mut self.sizeof_float,
            "double" => &mut self.sizeof_double,
            "long-double" => &mut self.sizeof_long_double,
            "pointer" => &mut self.sizeof_pointer,
            "size_t" => &mut self.sizeof_size_t,
            "wchar_t" => &mut self.sizeof_wchar_t,
            _ => return None,
        };
        Some(field)
    }
}

fn parse_width(tag: &str, text: &str) -> Result<u32> {
    text.parse::<u32>()
        .map_err(|_| ImportError::malformed(format!("<{tag}> is not a decimal number: '{text}'")))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

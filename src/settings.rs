//! Compile configurations and the import context that collects them.
//!
//! [`Settings`] owns the active [`PlatformProfile`] and the ordered list of
//! [`CompileConfiguration`]s produced by the importers. It is passed around
//! explicitly; nothing in this crate keeps global state.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::condition::{ExpressionParser, MsBuildExpressionParser};
use crate::error::Result;
use crate::path;
use crate::platform::{PlatformProfile, PlatformType};
use crate::{compile_commands, vcxproj};

// ═══════════════════════════════════════════════════════════════════════════════
//  Compile configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// A preprocessor define: `NAME` or `NAME=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// Split `NAME=VALUE` at the first `=`.
    pub fn parse(text: &str) -> Self {
        match text.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                name: text.to_string(),
                value: None,
            },
        }
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Source language, judged from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    C,
    Cpp,
}

/// How to preprocess and parse one source file for one build variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileConfiguration {
    /// Normalized path with `/` separators.
    pub filename: String,
    /// In command-line order; repeated defines are all kept.
    pub defines: Vec<Define>,
    pub undefines: BTreeSet<String>,
    /// In search order.
    pub include_paths: Vec<String>,
    /// `None` means "use the active profile".
    pub platform: Option<PlatformType>,
}

impl CompileConfiguration {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Defines in the `A=1;B;` form, each one terminated by `;`.
    pub fn defines_string(&self) -> String {
        self.defines.iter().map(|d| format!("{d};")).collect()
    }

    pub fn language(&self) -> Option<Language> {
        if path::is_c(&self.filename) {
            Some(Language::C)
        } else if path::is_cpp(&self.filename) {
            Some(Language::Cpp)
        } else {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Dispatch
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of build descriptor, decided by file name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    /// `compile_commands.json`.
    CompileCommands,
    /// Any file whose name contains `.vcxproj`.
    Vcxproj,
}

impl ProjectKind {
    pub fn detect(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?;
        if name == "compile_commands.json" {
            Some(Self::CompileCommands)
        } else if name.contains(".vcxproj") {
            Some(Self::Vcxproj)
        } else {
            None
        }
    }
}

/// Import any supported build descriptor.
///
/// Unsupported file names, unreadable files and malformed documents all
/// produce an empty list.
pub fn import_project<P>(path: impl AsRef<Path>, parser: &P) -> Vec<CompileConfiguration>
where
    P: ExpressionParser + ?Sized,
{
    let path = path.as_ref();
    match ProjectKind::detect(path) {
        Some(ProjectKind::CompileCommands) => compile_commands::import_compile_commands_file(path),
        Some(ProjectKind::Vcxproj) => vcxproj::import_vcxproj_with(path, parser),
        None => {
            log::debug!("{}: not a recognized build descriptor", path.display());
            Vec::new()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Settings – explicit import context
// ═══════════════════════════════════════════════════════════════════════════════

/// Active platform profile plus the compile configurations imported so far.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub platform: PlatformProfile,
    pub file_settings: Vec<CompileConfiguration>,
}

impl Settings {
    /// Host platform profile, no configurations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the built-in profile called `name`. Unknown names leave the
    /// active profile unchanged.
    pub fn select_platform(&mut self, name: &str) -> Result<()> {
        self.platform.select(name)
    }

    /// Override the active profile from a profile document.
    pub fn platform_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.platform.load_file(path)
    }

    /// Import a build descriptor and append its configurations.
    ///
    /// Returns how many configurations were added.
    pub fn import_project(&mut self, path: impl AsRef<Path>) -> usize {
        self.import_project_with(path, &MsBuildExpressionParser)
    }

    /// Like [`import_project`](Self::import_project) with a custom condition
    /// parser for `.vcxproj` files.
    pub fn import_project_with<P>(&mut self, path: impl AsRef<Path>, parser: &P) -> usize
    where
        P: ExpressionParser + ?Sized,
    {
        let imported = import_project(path, parser);
        let count = imported.len();
        self.file_settings.extend(imported);
        count
    }

    /// Effective profile for one configuration: its own platform when it has
    /// one, otherwise the active profile.
    pub fn profile_for(&self, cfg: &CompileConfiguration) -> PlatformProfile {
        cfg.platform
            .and_then(PlatformProfile::builtin)
            .unwrap_or_else(|| self.platform.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  SettingsBuilder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for a [`Settings`] context.
///
/// Later calls override earlier ones, so a profile document loaded after
/// [`platform`](Self::platform) adjusts that built-in profile.
///
/// # Example
/// ```no_run
/// use buildimport_rs::{PlatformType, SettingsBuilder};
///
/// let mut settings = SettingsBuilder::new()
///     .platform(PlatformType::Unix32)
///     .platform_file("avr8.xml")
///     .unwrap()
///     .build();
/// settings.import_project("build/compile_commands.json");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    platform: PlatformProfile,
}

impl SettingsBuilder {
    /// Start from the host profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a built-in profile. [`PlatformType::Custom`] is ignored.
    pub fn platform(mut self, platform_type: PlatformType) -> Self {
        if let Some(profile) = PlatformProfile::builtin(platform_type) {
            self.platform = profile;
        }
        self
    }

    /// Use the built-in profile called `name` (`win64`, `unix32`, …).
    pub fn platform_name(mut self, name: &str) -> Result<Self> {
        self.platform.select(name)?;
        Ok(self)
    }

    /// Apply a profile document on top of the current profile.
    pub fn platform_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.platform.load_file(path)?;
        Ok(self)
    }

    pub fn build(self) -> Settings {
        Settings {
            platform: self.platform,
            file_settings: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

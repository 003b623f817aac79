pub mod compile_commands;
pub mod condition;
pub mod error;
pub mod path;
pub mod platform;
pub mod settings;
pub mod vcxproj;

pub use compile_commands::{import_compile_commands, import_compile_commands_file};
pub use condition::{ExpressionParser, MsBuildExpressionParser};
pub use error::{ImportError, Result};
pub use platform::{PlatformProfile, PlatformType};
pub use settings::{CompileConfiguration, Define, Settings, SettingsBuilder, import_project};
pub use vcxproj::{Vcxproj, import_vcxproj};

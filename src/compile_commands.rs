//! Import of `compile_commands.json` compilation databases.
//!
//! Each database entry names a source `file` and the `command` that compiles
//! it. The command line is scanned for `-D`/`/D` defines, `-U`/`/U`
//! undefines and `-I`/`/I` include paths; everything else on the line is
//! ignored. The import is best effort: a broken entry is skipped and never
//! stops the rest of the database from loading.

use serde::Deserialize;

use crate::error::{ImportError, Result, read_file};
use crate::path;
use crate::settings::{CompileConfiguration, Define};

// ═══════════════════════════════════════════════════════════════════════════════
//  Database entries
// ═══════════════════════════════════════════════════════════════════════════════

/// One entry of the compilation database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompileCommand {
    /// Working directory of the compiler; relative `file`s are resolved
    /// against it.
    pub directory: Option<String>,
    pub file: Option<String>,
    pub command: Option<String>,
    /// Pre-split command line, used when `command` is absent.
    pub arguments: Option<Vec<String>>,
}

impl CompileCommand {
    /// The command line, rebuilding it from `arguments` when needed.
    pub fn command_line(&self) -> Option<String> {
        self.command
            .clone()
            .or_else(|| self.arguments.as_ref().map(|args| args.join(" ")))
            .filter(|c| !c.is_empty())
    }

    /// Normalized source path, joined with `directory` when relative.
    pub fn filename(&self) -> Option<String> {
        let file = self.file.as_deref().filter(|f| !f.is_empty())?;
        let joined = match self.directory.as_deref() {
            Some(dir) if !dir.is_empty() && !path::is_absolute(file) => {
                format!("{}/{}", dir.trim_end_matches(['/', '\\']), file)
            }
            _ => file.to_string(),
        };
        Some(path::simplify_path(&path::from_native_separators(&joined)))
    }

    /// Build the compile configuration for this entry.
    ///
    /// `None` when the entry lacks a file name or a command line.
    pub fn to_configuration(&self) -> Option<CompileConfiguration> {
        let filename = self.filename()?;
        let command = self.command_line()?;

        let mut cfg = CompileConfiguration::new(filename);
        for flag in scan_flags(&command) {
            match flag.kind {
                FlagKind::Define => cfg.defines.push(Define::parse(flag.argument)),
                FlagKind::Undefine => {
                    cfg.undefines.insert(flag.argument.to_string());
                }
                FlagKind::Include => cfg.include_paths.push(path::remove_quotation_marks(flag.argument)),
            }
        }
        Some(cfg)
    }
}

/// Parse a compilation database into its entries.
///
/// The document must be a JSON array. Entries that are not objects with
/// string fields are skipped with a warning.
pub fn parse_compile_commands(source: &str) -> Result<Vec<CompileCommand>> {
    let document: serde_json::Value = serde_json::from_str(source)?;
    let serde_json::Value::Array(entries) = document else {
        return Err(ImportError::malformed("compilation database is not a JSON array"));
    };

    let mut commands = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<CompileCommand>(entry) {
            Ok(command) => commands.push(command),
            Err(e) => log::warn!("skipping compilation database entry {index}: {e}"),
        }
    }
    Ok(commands)
}

/// Import a compilation database held in memory.
///
/// Entries with an empty or missing `file` or `command` produce nothing.
/// A document that cannot be parsed at all yields an empty list.
pub fn import_compile_commands(source: &str) -> Vec<CompileConfiguration> {
    let commands = match parse_compile_commands(source) {
        Ok(commands) => commands,
        Err(e) => {
            log::warn!("cannot import compilation database: {e}");
            return Vec::new();
        }
    };

    let configurations: Vec<CompileConfiguration> = commands
        .iter()
        .filter_map(CompileCommand::to_configuration)
        .collect();
    log::debug!(
        "compilation database: {} entries, {} configurations",
        commands.len(),
        configurations.len()
    );
    configurations
}

/// Import a compilation database from disk.
pub fn import_compile_commands_file(path: impl AsRef<std::path::Path>) -> Vec<CompileConfiguration> {
    let path = path.as_ref();
    match read_file(path) {
        Ok(source) => import_compile_commands(&source),
        Err(e) => {
            log::warn!("{e}");
            Vec::new()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Command-line flag scanner
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Define,
    Undefine,
    Include,
}

/// A recognized flag and its argument, borrowed from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag<'a> {
    pub kind: FlagKind,
    pub argument: &'a str,
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    /// Inside a token that is not a flag.
    Token,
    /// Just read a space.
    AfterSpace,
    /// Read `-` or `/` right after a space.
    AfterPrefix,
    /// Reading the argument of flag `kind`, which starts at byte `start`.
    Argument { kind: char, start: usize },
}

/// Scan a command line for define, undefine and include flags.
///
/// A flag is `-` or `/` directly after a space, then one kind character,
/// then its argument up to the next space or the end of the line. The first
/// token (the compiler) is never a flag. Unknown kinds and flags with an
/// empty argument are skipped.
///
/// A space right after `-` or `/` ends that token. It is not taken as a
/// flag kind, so in `gcc - -DX` the `-DX` is still read as a define.
pub fn scan_flags(command: &str) -> Vec<Flag<'_>> {
    let mut flags = Vec::new();
    let mut state = ScanState::Token;

    for (i, c) in command.char_indices() {
        state = match (state, c) {
            (ScanState::Argument { kind, start }, ' ') => {
                push_flag(&mut flags, kind, &command[start..i]);
                ScanState::AfterSpace
            }
            (ScanState::Argument { .. }, _) => state,
            (_, ' ') => ScanState::AfterSpace,
            (ScanState::AfterSpace, '-' | '/') => ScanState::AfterPrefix,
            (ScanState::AfterPrefix, kind) => ScanState::Argument {
                kind,
                start: i + kind.len_utf8(),
            },
            _ => ScanState::Token,
        };
    }

    if let ScanState::Argument { kind, start } = state {
        push_flag(&mut flags, kind, &command[start..]);
    }

    flags
}

fn push_flag<'a>(flags: &mut Vec<Flag<'a>>, kind: char, argument: &'a str) {
    let kind = match kind {
        'D' => FlagKind::Define,
        'U' => FlagKind::Undefine,
        'I' => FlagKind::Include,
        _ => {
            log::trace!("ignoring flag '{kind}{argument}'");
            return;
        }
    };
    if argument.is_empty() {
        log::trace!("ignoring {kind:?} flag without argument");
        return;
    }
    flags.push(Flag { kind, argument });
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(kind: FlagKind, argument: &str) -> Flag<'_> {
        Flag { kind, argument }
    }

    // ── Flag scanner ─────────────────────────────────────────────────────

    #[test]
    fn scan_dash_flags() {
        assert_eq!(
            scan_flags("gcc -DFOO=1 -Ibar -UBAZ a.c"),
            vec![
                flag(FlagKind::Define, "FOO=1"),
                flag(FlagKind::Include, "bar"),
                flag(FlagKind::Undefine, "BAZ"),
            ]
        );
    }

    #[test]
    fn scan_slash_flags() {
        assert_eq!(
            scan_flags("cl.exe /nologo /DWIN32 /IC:\\inc /c x.c"),
            vec![flag(FlagKind::Define, "WIN32"), flag(FlagKind::Include, "C:\\inc")]
        );
    }

    #[test]
    fn scan_trailing_flag_ends_at_end_of_string() {
        assert_eq!(scan_flags("gcc a.c -DLAST"), vec![flag(FlagKind::Define, "LAST")]);
    }

    #[test]
    fn scan_ignores_first_token() {
        assert!(scan_flags("-DNOT_A_FLAG").is_empty());
        assert!(scan_flags("").is_empty());
    }

    #[test]
    fn scan_requires_preceding_space() {
        assert!(scan_flags("gcc x-DFOO a/Ibar").is_empty());
    }

    #[test]
    fn scan_skips_unknown_and_empty_flags() {
        assert_eq!(
            scan_flags("gcc -O2 -Wall -D -I  -c - / -DX"),
            vec![flag(FlagKind::Define, "X")]
        );
    }

    #[test]
    fn scan_lone_prefix_does_not_swallow_next_flag() {
        assert_eq!(scan_flags("gcc - -DX"), vec![flag(FlagKind::Define, "X")]);
        assert_eq!(scan_flags("cl / /Iinc"), vec![flag(FlagKind::Include, "inc")]);
    }

    #[test]
    fn scan_keeps_order_and_duplicates() {
        let flags = scan_flags("cc -DA -DB -DA -Ione -Itwo -Ione");
        let args: Vec<&str> = flags.iter().map(|f| f.argument).collect();
        assert_eq!(args, ["A", "B", "A", "one", "two", "one"]);
    }

    #[test]
    fn scan_handles_multibyte_text() {
        assert_eq!(
            scan_flags("cc -Iinclüde -DÄ=1 ü.c"),
            vec![flag(FlagKind::Include, "inclüde"), flag(FlagKind::Define, "Ä=1")]
        );
    }

    // ── Database import ──────────────────────────────────────────────────

    #[test]
    fn single_record() {
        let cfgs = import_compile_commands(r#"[{"file":"a.c","command":"gcc -DFOO=1 -Ibar a.c"}]"#);
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].filename, "a.c");
        assert_eq!(cfgs[0].defines, vec![Define::parse("FOO=1")]);
        assert!(cfgs[0].defines_string().contains("FOO=1"));
        assert_eq!(cfgs[0].include_paths, vec!["bar".to_string()]);
        assert!(cfgs[0].undefines.is_empty());
        assert_eq!(cfgs[0].platform, None);
    }

    #[test]
    fn undefines_are_unique() {
        let cfgs = import_compile_commands(r#"[{"file":"a.c","command":"cc -UX -UY -UX a.c"}]"#);
        let undefines: Vec<&str> = cfgs[0].undefines.iter().map(String::as_str).collect();
        assert_eq!(undefines, ["X", "Y"]);
    }

    #[test]
    fn records_without_file_or_command_are_skipped() {
        let cfgs = import_compile_commands(
            r#"[
                {"file":"a.c"},
                {"command":"gcc -DX b.c"},
                {"file":"","command":"gcc c.c"},
                {"file":"d.c","command":""},
                {"file":"e.c","command":"gcc e.c"}
            ]"#,
        );
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].filename, "e.c");
    }

    #[test]
    fn malformed_entries_do_not_stop_import() {
        let cfgs = import_compile_commands(
            r#"[
                42,
                {"file": 7, "command": "gcc -DX x.c"},
                {"file":"ok.c","command":"gcc -DOK ok.c"}
            ]"#,
        );
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].filename, "ok.c");
    }

    #[test]
    fn unparseable_database_is_empty() {
        assert!(import_compile_commands("not json").is_empty());
        assert!(import_compile_commands(r#"{"file":"a.c","command":"gcc a.c"}"#).is_empty());
        assert!(parse_compile_commands("[").is_err());
    }

    #[test]
    fn directory_and_arguments() {
        let cfgs = import_compile_commands(
            r#"[{
                "directory": "/build/",
                "file": "../src/x.cpp",
                "arguments": ["c++", "-DA", "-I\"my_inc\"", "-c", "../src/x.cpp"]
            }]"#,
        );
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].filename, "/src/x.cpp");
        assert_eq!(cfgs[0].defines, vec![Define::parse("A")]);
        assert_eq!(cfgs[0].include_paths, vec!["my_inc".to_string()]);
    }

    #[test]
    fn windows_file_names_are_normalized() {
        let cfgs = import_compile_commands(
            r#"[{"file":"C:\\work\\.\\src\\win.c","command":"cl /DWIN32 /c win.c"}]"#,
        );
        assert_eq!(cfgs[0].filename, "C:/work/src/win.c");
    }

    #[test]
    fn fixture_database() {
        let cfgs = import_compile_commands_file("testdata/compile_commands.json");
        assert_eq!(cfgs.len(), 3);

        let main = &cfgs[0];
        assert_eq!(main.filename, "/home/user/proj/src/main.c");
        assert_eq!(main.defines_string(), "NDEBUG;VERSION=\"1.2\";");
        assert_eq!(main.include_paths, ["/home/user/proj/include", "include"]);
        assert!(main.undefines.contains("DEBUG"));

        let util = &cfgs[1];
        assert_eq!(util.filename, "/home/user/proj/src/util.cpp");
        assert_eq!(util.defines, vec![Define::parse("USE_CPP")]);
        assert!(util.include_paths.is_empty());

        let win = &cfgs[2];
        assert_eq!(win.filename, "C:/src/win.c");
        assert_eq!(win.defines_string(), "WIN32;_DEBUG;");
        assert_eq!(win.include_paths, ["C:\\work\\inc"]);
    }

    #[test]
    fn missing_file_is_empty() {
        assert!(import_compile_commands_file("testdata/no/compile_commands.json").is_empty());
    }
}

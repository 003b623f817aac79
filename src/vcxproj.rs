//! Import of MSBuild `.vcxproj` project files.
//!
//! Only three parts of the project are read:
//!
//! - the `ItemGroup Label="ProjectConfigurations"` build axis,
//! - `ClCompile Include="…"` items in every other `ItemGroup`,
//! - `ItemDefinitionGroup`s with their optional `Condition` and the
//!   `PreprocessorDefinitions` / `AdditionalIncludeDirectories` of their
//!   first `ClCompile` block.
//!
//! [`Vcxproj::compile_configurations`] then emits one
//! [`CompileConfiguration`] per (file, axis entry, satisfied group).

use std::path::Path;

use crate::condition::{self, ExpressionParser, MsBuildExpressionParser};
use crate::error::{Result, read_file};
use crate::path;
use crate::platform::PlatformType;
use crate::settings::{CompileConfiguration, Define};

// ═══════════════════════════════════════════════════════════════════════════════
//  Project model
// ═══════════════════════════════════════════════════════════════════════════════

/// One `(Configuration, Platform)` pair, e.g. `Debug|Win32`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectConfiguration {
    pub configuration: String,
    pub platform: String,
}

impl ProjectConfiguration {
    /// Built-in profile for this platform name: `Win32` and `x64` only.
    pub fn platform_type(&self) -> Option<PlatformType> {
        match self.platform.as_str() {
            "Win32" => Some(PlatformType::Win32W),
            "x64" => Some(PlatformType::Win64),
            _ => None,
        }
    }
}

/// Compile options guarded by an optional condition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemDefinitionGroup {
    pub condition: Option<String>,
    pub defines: Vec<Define>,
    pub include_paths: Vec<String>,
}

impl ItemDefinitionGroup {
    /// `true` when the group applies to `axis`.
    ///
    /// A missing or blank condition always applies.
    pub fn applies_to<P>(&self, parser: &P, axis: &ProjectConfiguration) -> bool
    where
        P: ExpressionParser + ?Sized,
    {
        match self.condition.as_deref() {
            Some(cond) if !cond.trim().is_empty() => condition::is_true(parser, cond, axis),
            _ => true,
        }
    }

    fn parse(node: &roxmltree::Node) -> Self {
        let mut group = Self {
            condition: node.attribute("Condition").map(String::from),
            ..Default::default()
        };

        if let Some(cl) = find_child(node, "ClCompile") {
            if let Some(text) = find_child_text(&cl, "PreprocessorDefinitions") {
                group.defines = split_list(&text).map(Define::parse).collect();
            }
            if let Some(text) = find_child_text(&cl, "AdditionalIncludeDirectories") {
                group.include_paths = split_list(&text).map(String::from).collect();
            }
        }

        group
    }
}

/// The parts of a `.vcxproj` that matter for compile configurations.
#[derive(Debug, Clone, Default)]
pub struct Vcxproj {
    /// Build axis, in document order.
    pub configurations: Vec<ProjectConfiguration>,
    /// `ClCompile Include` values, as written in the project.
    pub compile_files: Vec<String>,
    pub item_definition_groups: Vec<ItemDefinitionGroup>,
    /// Directory of the project file including its trailing separator.
    /// `None` when created via [`Vcxproj::parse`].
    directory: Option<String>,
}

impl Vcxproj {
    /// Parse a project from its XML source.
    ///
    /// The root element is walked whatever its name; only the children
    /// listed in the module docs are read.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(source)?;
        let root = doc.root_element();

        let mut project = Self::default();
        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "ItemGroup" if child.attribute("Label") == Some("ProjectConfigurations") => {
                    project.configurations.extend(
                        child
                            .children()
                            .filter(|n| n.is_element() && n.tag_name().name() == "ProjectConfiguration")
                            .map(|n| ProjectConfiguration {
                                configuration: find_child_text(&n, "Configuration").unwrap_or_default(),
                                platform: find_child_text(&n, "Platform").unwrap_or_default(),
                            }),
                    );
                }
                "ItemGroup" => {
                    project.compile_files.extend(
                        child
                            .children()
                            .filter(|n| n.is_element() && n.tag_name().name() == "ClCompile")
                            .filter_map(|n| n.attribute("Include"))
                            .map(String::from),
                    );
                }
                "ItemDefinitionGroup" => {
                    project.item_definition_groups.push(ItemDefinitionGroup::parse(&child));
                }
                _ => {}
            }
        }

        Ok(project)
    }

    /// Load a project from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = read_file(path)?;
        let mut project = Self::parse(&source)?;
        project.directory = Some(path::directory_of(&path.to_string_lossy()).to_string());
        Ok(project)
    }

    /// Directory of the project file, if it was loaded from disk.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    /// Cross product of files, axis entries and applicable groups.
    ///
    /// File names are resolved against `project_dir`, which should end with a
    /// separator (or be empty). Groups that apply at the same time each give
    /// their own configuration.
    pub fn compile_configurations<P>(&self, project_dir: &str, parser: &P) -> Vec<CompileConfiguration>
    where
        P: ExpressionParser + ?Sized,
    {
        let mut configurations = Vec::new();

        for file in &self.compile_files {
            let filename = path::simplify_path(&path::from_native_separators(&format!("{project_dir}{file}")));

            for axis in &self.configurations {
                for group in &self.item_definition_groups {
                    if !group.applies_to(parser, axis) {
                        continue;
                    }
                    configurations.push(CompileConfiguration {
                        filename: filename.clone(),
                        defines: group.defines.clone(),
                        undefines: Default::default(),
                        include_paths: group.include_paths.clone(),
                        platform: axis.platform_type(),
                    });
                }
            }
        }

        configurations
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Import entry points
// ═══════════════════════════════════════════════════════════════════════════════

/// Import a project file with the default condition parser.
pub fn import_vcxproj(path: impl AsRef<Path>) -> Vec<CompileConfiguration> {
    import_vcxproj_with(path, &MsBuildExpressionParser)
}

/// Import a project file, evaluating conditions with `parser`.
///
/// Unreadable or malformed projects yield an empty list.
pub fn import_vcxproj_with<P>(path: impl AsRef<Path>, parser: &P) -> Vec<CompileConfiguration>
where
    P: ExpressionParser + ?Sized,
{
    let path = path.as_ref();
    let project = match Vcxproj::from_file(path) {
        Ok(project) => project,
        Err(e) => {
            log::warn!("cannot import {}: {e}", path.display());
            return Vec::new();
        }
    };

    let configurations = project.compile_configurations(project.directory().unwrap_or(""), parser);
    log::debug!(
        "{}: {} files, {} build configurations, {} item definition groups, {} compile configurations",
        path.display(),
        project.compile_files.len(),
        project.configurations.len(),
        project.item_definition_groups.len(),
        configurations.len()
    );
    configurations
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Split a `;`-separated MSBuild list, dropping empty entries and inherited
/// `%(…)` references.
fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with("%("))
}

fn find_child<'a, 'input>(
    parent: &roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

fn find_child_text(parent: &roxmltree::Node, tag: &str) -> Option<String> {
    find_child(parent, tag)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    const NS: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

    fn project(configurations: &[(&str, &str)], files: &[&str], groups: &str) -> String {
        let configurations: String = configurations
            .iter()
            .map(|(c, p)| {
                format!(
                    "<ProjectConfiguration Include=\"{c}|{p}\">\
                     <Configuration>{c}</Configuration><Platform>{p}</Platform>\
                     </ProjectConfiguration>"
                )
            })
            .collect();
        let files: String = files
            .iter()
            .map(|f| format!("<ClCompile Include=\"{f}\" />"))
            .collect();
        format!(
            "<Project xmlns=\"{NS}\">\
             <ItemGroup Label=\"ProjectConfigurations\">{configurations}</ItemGroup>\
             <ItemGroup>{files}</ItemGroup>\
             {groups}\
             </Project>"
        )
    }

    fn group(condition: Option<&str>, defines: &str, includes: &str) -> String {
        let condition = condition
            .map(|c| format!(" Condition=\"{c}\""))
            .unwrap_or_default();
        format!(
            "<ItemDefinitionGroup{condition}><ClCompile>\
             <PreprocessorDefinitions>{defines}</PreprocessorDefinitions>\
             <AdditionalIncludeDirectories>{includes}</AdditionalIncludeDirectories>\
             </ClCompile></ItemDefinitionGroup>"
        )
    }

    fn configurations(source: &str) -> Vec<CompileConfiguration> {
        Vcxproj::parse(source)
            .unwrap()
            .compile_configurations("", &MsBuildExpressionParser)
    }

    // ── Model parsing ────────────────────────────────────────────────────

    #[test]
    fn parse_model() {
        let source = project(
            &[("Debug", "Win32"), ("Release", "x64")],
            &["a.cpp", "src\\b.cpp"],
            &group(None, "A;B=2;%(PreprocessorDefinitions)", "inc;;%(AdditionalIncludeDirectories)"),
        );
        let p = Vcxproj::parse(&source).unwrap();
        assert_eq!(p.configurations.len(), 2);
        assert_eq!(p.configurations[1].configuration, "Release");
        assert_eq!(p.configurations[1].platform, "x64");
        assert_eq!(p.compile_files, ["a.cpp", "src\\b.cpp"]);
        assert_eq!(p.item_definition_groups.len(), 1);
        let g = &p.item_definition_groups[0];
        assert_eq!(g.condition, None);
        assert_eq!(g.defines, vec![Define::parse("A"), Define::parse("B=2")]);
        assert_eq!(g.include_paths, ["inc"]);
        assert_eq!(p.directory(), None);
    }

    #[test]
    fn parse_accepts_any_root_name() {
        let p = Vcxproj::parse("<Solution/>").unwrap();
        assert!(p.configurations.is_empty());
        assert!(p.compile_files.is_empty());
        assert!(p.item_definition_groups.is_empty());

        let source = project(&[("Debug", "Win32")], &["x.cpp"], &group(None, "BAR", ""))
            .replace("<Project ", "<Root ")
            .replace("</Project>", "</Root>");
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].defines_string(), "BAR;");
    }

    #[test]
    fn parse_rejects_broken_xml() {
        assert!(matches!(Vcxproj::parse("<Project>"), Err(ImportError::Xml(_))));
    }

    #[test]
    fn group_without_cl_compile_is_empty() {
        let source = project(
            &[("Debug", "Win32")],
            &["a.cpp"],
            "<ItemDefinitionGroup><Link><SubSystem>Console</SubSystem></Link></ItemDefinitionGroup>",
        );
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 1);
        assert!(cfgs[0].defines.is_empty());
        assert!(cfgs[0].include_paths.is_empty());
    }

    #[test]
    fn platform_mapping() {
        let axis = |p: &str| ProjectConfiguration {
            configuration: "Debug".into(),
            platform: p.into(),
        };
        assert_eq!(axis("Win32").platform_type(), Some(PlatformType::Win32W));
        assert_eq!(axis("x64").platform_type(), Some(PlatformType::Win64));
        assert_eq!(axis("ARM64").platform_type(), None);
        assert_eq!(axis("win32").platform_type(), None);
    }

    // ── Cross product ────────────────────────────────────────────────────

    #[test]
    fn single_unconditional_group() {
        let source = project(&[("Debug", "Win32")], &["x.cpp"], &group(None, "BAR", ""));
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].filename, "x.cpp");
        assert_eq!(cfgs[0].defines, vec![Define::parse("BAR")]);
        assert_eq!(cfgs[0].platform, Some(PlatformType::Win32W));
    }

    #[test]
    fn blank_condition_is_unconditional() {
        let source = project(&[("Debug", "Win32")], &["x.cpp"], &group(Some("  "), "BAR", ""));
        assert_eq!(configurations(&source).len(), 1);
    }

    #[test]
    fn one_configuration_per_satisfied_pair() {
        let groups = group(Some("'$(Configuration)'=='Debug'"), "DBG", "")
            + &group(Some("'$(Configuration)'=='Release'"), "NDEBUG", "");
        let source = project(&[("Debug", "Win32"), ("Release", "x64")], &["a.cpp", "b.cpp"], &groups);
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 4);

        for file in ["a.cpp", "b.cpp"] {
            let per_file: Vec<_> = cfgs.iter().filter(|c| c.filename == file).collect();
            assert_eq!(per_file.len(), 2);
            assert_eq!(per_file[0].defines_string(), "DBG;");
            assert_eq!(per_file[0].platform, Some(PlatformType::Win32W));
            assert_eq!(per_file[1].defines_string(), "NDEBUG;");
            assert_eq!(per_file[1].platform, Some(PlatformType::Win64));
        }
    }

    #[test]
    fn simultaneously_true_groups_are_not_merged() {
        let groups = group(None, "COMMON", "") + &group(Some("'$(Platform)'=='Win32'"), "WIN32", "");
        let source = project(&[("Debug", "Win32")], &["a.c"], &groups);
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 2);
        assert_eq!(cfgs[0].defines_string(), "COMMON;");
        assert_eq!(cfgs[1].defines_string(), "WIN32;");
    }

    #[test]
    fn unknown_platform_inherits_profile() {
        let source = project(&[("Debug", "ARM64")], &["a.c"], &group(None, "", ""));
        let cfgs = configurations(&source);
        assert_eq!(cfgs.len(), 1);
        assert_eq!(cfgs[0].platform, None);
    }

    #[test]
    fn no_axis_or_no_files_means_nothing() {
        assert!(configurations(&project(&[], &["a.c"], &group(None, "A", ""))).is_empty());
        assert!(configurations(&project(&[("Debug", "Win32")], &[], &group(None, "A", ""))).is_empty());
        assert!(configurations(&project(&[("Debug", "Win32")], &["a.c"], "")).is_empty());
    }

    #[test]
    fn file_names_are_joined_and_normalized() {
        let source = project(&[("Debug", "Win32")], &["..\\src\\.\\main.cpp"], &group(None, "", ""));
        let cfgs = Vcxproj::parse(&source)
            .unwrap()
            .compile_configurations("C:\\work\\proj\\", &MsBuildExpressionParser);
        assert_eq!(cfgs[0].filename, "C:/work/src/main.cpp");
    }

    // ── File import ──────────────────────────────────────────────────────

    #[test]
    fn import_fixture_project() {
        let cfgs = import_vcxproj("testdata/example.vcxproj");
        // 3 files × (Debug|Win32: common + debug, Release|x64: common + release)
        assert_eq!(cfgs.len(), 12);

        let first = &cfgs[0];
        assert_eq!(first.filename, "testdata/src/main.cpp");
        assert_eq!(first.platform, Some(PlatformType::Win32W));
        assert_eq!(first.defines_string(), "WIN32;_CONSOLE;");
        assert_eq!(first.include_paths, ["include", "$(SolutionDir)third_party"]);

        let debug = &cfgs[1];
        assert_eq!(debug.defines_string(), "_DEBUG;");

        let release = &cfgs[3];
        assert_eq!(release.platform, Some(PlatformType::Win64));
        assert_eq!(release.defines_string(), "NDEBUG;");

        assert_eq!(cfgs[8].filename, "testdata/util/strings.c");
    }

    #[test]
    fn missing_project_is_empty() {
        assert!(import_vcxproj("testdata/does-not-exist.vcxproj").is_empty());
    }
}

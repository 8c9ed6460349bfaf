// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shader function libraries inlined by the GLSL family writers.
//!
//! Libraries are plain source files named `<library>.<extension>`. They are
//! read through a [`LibraryLocator`], scanned for `#define` lines and
//! function definitions, and kept in a [`FunctionLibraryCache`] so each file
//! is parsed at most once per cache.

use crate::error::WriterError;
use ahash::{AHashMap, AHashSet};
use rtss_core::{atom::AtomKind, Program};
use std::{
    collections::VecDeque,
    fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, PoisonError, RwLock,
    },
};

/// Source of library text.
pub trait LibraryLocator: Send + Sync {
    /// Reads the library file `file_name` (`FFPLib_Common.glsl`, ...).
    fn open(&self, file_name: &str) -> io::Result<String>;
}

/// Looks libraries up in a list of directories, first match wins.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLocator {
    paths: Vec<PathBuf>,
}

impl DirectoryLocator {
    /// Creates a locator over the given search paths.
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// The search paths, in lookup order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl LibraryLocator for DirectoryLocator {
    fn open(&self, file_name: &str) -> io::Result<String> {
        for dir in &self.paths {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                log::debug!("Reading shader library {}", candidate.display());
                return fs::read_to_string(candidate);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{file_name} not found in {} search path(s)", self.paths.len()),
        ))
    }
}

/// Serves library text kept in memory. Counts how often a file was opened.
#[derive(Debug, Default)]
pub struct MemoryLocator {
    sources: AHashMap<String, String>,
    opened: AtomicUsize,
}

impl MemoryLocator {
    /// Creates an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file and returns the locator.
    #[must_use]
    pub fn with_source(mut self, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(file_name, text);
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, file_name: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(file_name.into(), text.into());
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl LibraryLocator for MemoryLocator {
    fn open(&self, file_name: &str) -> io::Result<String> {
        let text = self
            .sources
            .get(file_name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file_name.to_string()))?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(text)
    }
}

impl<L: LibraryLocator + ?Sized> LibraryLocator for Arc<L> {
    fn open(&self, file_name: &str) -> io::Result<String> {
        (**self).open(file_name)
    }
}

/// One function definition found in a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFunction {
    name: String,
    return_type: String,
    source: String,
    calls: Vec<String>,
}

impl LibraryFunction {
    /// Function name. Overloads share it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type.
    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    /// Full definition, signature and body, newline terminated.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Identifiers called from the body, in first-use order. Includes
    /// builtins; callers filter them against the known libraries.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

/// A parsed library file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionLibrary {
    name: String,
    defines: Vec<String>,
    functions: Vec<LibraryFunction>,
}

impl FunctionLibrary {
    /// Scans library text for `#define` lines and function definitions.
    ///
    /// Comments are skipped. A definition starts on a line whose first word
    /// is a basic type followed by an identifier and `(`, and ends where its
    /// braces balance. Prototypes without a body are ignored.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        let name = name.into();
        let mut defines = Vec::new();
        let mut functions = Vec::new();
        let mut in_comment = false;
        let mut lines = text.lines();

        while let Some(raw) = lines.next() {
            let line = raw.trim();
            if in_comment {
                in_comment = !line.contains("*/");
                continue;
            }
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if line.starts_with("/*") {
                in_comment = !line.contains("*/");
                continue;
            }
            if line.starts_with("#define") {
                defines.push(line.to_string());
                continue;
            }
            let Some((return_type, function_name)) = signature_start(line) else {
                continue;
            };

            let mut source = String::new();
            let mut depth = 0i32;
            let mut opened = false;
            let mut current = raw;
            loop {
                source.push_str(current.trim_end());
                source.push('\n');
                for c in current.chars() {
                    match c {
                        '{' => {
                            depth += 1;
                            opened = true;
                        }
                        '}' => depth -= 1,
                        _ => {}
                    }
                }
                if opened && depth <= 0 {
                    break;
                }
                if !opened && current.trim_end().ends_with(';') {
                    source.clear();
                    break;
                }
                match lines.next() {
                    Some(next) => current = next,
                    None => break,
                }
            }
            if source.is_empty() {
                continue;
            }

            let body = source.find('{').map_or("", |start| &source[start..]);
            let calls = called_identifiers(body)
                .into_iter()
                .filter(|call| call != function_name)
                .collect();
            functions.push(LibraryFunction {
                name: function_name.to_string(),
                return_type: return_type.to_string(),
                calls,
                source,
            });
        }

        log::debug!(
            "Parsed shader library '{}': {} function(s), {} define(s)",
            name,
            functions.len(),
            defines.len()
        );
        Self {
            name,
            defines,
            functions,
        }
    }

    /// Library name, without extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `#define` lines, copied verbatim.
    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    /// All definitions in file order.
    pub fn functions(&self) -> &[LibraryFunction] {
        &self.functions
    }

    /// All overloads of `name`.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LibraryFunction> + 'a {
        self.functions.iter().filter(move |f| f.name == name)
    }
}

fn is_basic_type(word: &str) -> bool {
    matches!(
        word,
        "void"
            | "bool"
            | "float"
            | "int"
            | "vec2"
            | "vec3"
            | "vec4"
            | "ivec2"
            | "ivec3"
            | "ivec4"
            | "mat2"
            | "mat3"
            | "mat4"
            | "mat2x3"
            | "mat2x4"
            | "mat3x2"
            | "mat3x4"
            | "mat4x2"
            | "mat4x3"
            | "sampler2D"
            | "samplerCube"
    )
}

fn is_identifier(word: &str) -> bool {
    !word.is_empty()
        && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !word.starts_with(|c: char| c.is_ascii_digit())
}

fn is_keyword(word: &str) -> bool {
    matches!(word, "if" | "for" | "while" | "switch" | "return")
}

/// Return type and name when `line` opens a function definition.
fn signature_start(line: &str) -> Option<(&str, &str)> {
    let (return_type, rest) = line.split_once(char::is_whitespace)?;
    if !is_basic_type(return_type) {
        return None;
    }
    let paren = rest.find('(')?;
    let name = rest[..paren].trim();
    is_identifier(name).then_some((return_type, name))
}

/// Identifiers directly followed by `(`, deduplicated in first-use order.
fn called_identifiers(text: &str) -> Vec<String> {
    let mut calls: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut pending: Option<String> = None;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            pending = None;
            current.push(c);
            continue;
        }
        if !current.is_empty() {
            pending = Some(std::mem::take(&mut current));
        }
        if c == '(' {
            if let Some(name) = pending.take() {
                if is_identifier(&name) && !is_keyword(&name) && !calls.contains(&name) {
                    calls.push(name);
                }
            }
        } else if !c.is_whitespace() {
            pending = None;
        }
    }
    calls
}

/// Parsed libraries shared by all writers of a process.
///
/// Each `<library>.<extension>` file is opened and parsed at most once; later
/// loads return the same [`Arc`].
pub struct FunctionLibraryCache {
    locator: Box<dyn LibraryLocator>,
    libraries: RwLock<AHashMap<String, Arc<FunctionLibrary>>>,
}

impl std::fmt::Debug for FunctionLibraryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionLibraryCache")
            .field("loaded", &self.len())
            .finish()
    }
}

impl FunctionLibraryCache {
    /// Creates an empty cache reading through `locator`.
    pub fn new(locator: impl LibraryLocator + 'static) -> Self {
        Self {
            locator: Box::new(locator),
            libraries: RwLock::new(AHashMap::new()),
        }
    }

    /// Returns the parsed library, reading it on first use.
    pub fn load(&self, library: &str, extension: &str) -> Result<Arc<FunctionLibrary>, WriterError> {
        let file_name = format!("{library}.{extension}");
        if let Some(found) = self
            .libraries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&file_name)
        {
            return Ok(Arc::clone(found));
        }

        let mut libraries = self.libraries.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have loaded it while we waited for the lock.
        if let Some(found) = libraries.get(&file_name) {
            return Ok(Arc::clone(found));
        }
        let text = self
            .locator
            .open(&file_name)
            .map_err(|source| WriterError::LibraryNotFound {
                name: file_name.clone(),
                source,
            })?;
        let parsed = Arc::new(FunctionLibrary::parse(library, &text));
        log::info!("Loaded shader library '{}'", file_name);
        libraries.insert(file_name, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Loads every dependency of `program`, in dependency order.
    pub fn load_dependencies(
        &self,
        program: &Program,
        extension: &str,
    ) -> Result<Vec<Arc<FunctionLibrary>>, WriterError> {
        program
            .dependencies()
            .iter()
            .map(|library| self.load(library, extension))
            .collect()
    }

    /// Number of parsed libraries.
    pub fn len(&self) -> usize {
        self.libraries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing was loaded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Library functions reachable from the invocations of `program`, callees
/// before callers.
///
/// The closure follows calls across all given libraries. Every overload of a
/// reached name is included. Ties keep library order, then file order.
pub fn discover_function_dependencies<'a>(
    program: &Program,
    libraries: &'a [Arc<FunctionLibrary>],
) -> Result<Vec<&'a LibraryFunction>, WriterError> {
    let mut by_name: AHashMap<&str, Vec<(usize, usize)>> = AHashMap::new();
    for (lib, library) in libraries.iter().enumerate() {
        for (index, function) in library.functions().iter().enumerate() {
            by_name.entry(function.name()).or_default().push((lib, index));
        }
    }
    let function =
        move |(lib, index): (usize, usize)| -> &'a LibraryFunction { &libraries[lib].functions()[index] };

    let mut pending: VecDeque<&str> = program
        .entry_point()
        .sorted_atom_instances()
        .into_iter()
        .filter_map(|atom| match atom.kind() {
            AtomKind::Invocation { function_name, .. } => Some(function_name.as_str()),
            _ => None,
        })
        .collect();

    let mut seen = AHashSet::new();
    let mut needed = Vec::new();
    while let Some(name) = pending.pop_front() {
        let Some(nodes) = by_name.get(name) else {
            continue;
        };
        for &node in nodes {
            if seen.insert(node) {
                needed.push(node);
                pending.extend(function(node).calls().iter().map(String::as_str));
            }
        }
    }
    needed.sort_unstable();

    let mut edges = Vec::new();
    for &caller in &needed {
        for call in function(caller).calls() {
            for &callee in by_name.get(call.as_str()).into_iter().flatten() {
                if callee != caller {
                    edges.push((callee, caller));
                }
            }
        }
    }

    let order = topological_order(needed, edges).map_err(|Cycle(remaining)| {
        let names: Vec<&str> = remaining.into_iter().map(|node| function(node).name()).collect();
        WriterError::CyclicLibraryDependency(names.join(", "))
    })?;
    Ok(order.into_iter().map(function).collect())
}

/// Nodes left unsorted because they sit on or behind a cycle.
struct Cycle<T>(Vec<T>);

/// Kahn's algorithm. Edges run from prerequisite to dependant; ready nodes
/// are emitted in the order they appear in `nodes`.
fn topological_order<T>(nodes: Vec<T>, edges: Vec<(T, T)>) -> Result<Vec<T>, Cycle<T>>
where
    T: Copy + Eq + std::hash::Hash,
{
    let mut dependants: AHashMap<T, Vec<T>> = AHashMap::new();
    let mut in_degree: AHashMap<T, usize> = nodes.iter().map(|node| (*node, 0)).collect();
    for (before, after) in edges {
        dependants.entry(before).or_default().push(after);
        if let Some(degree) = in_degree.get_mut(&after) {
            *degree += 1;
        }
    }

    let mut queue: VecDeque<T> = nodes
        .iter()
        .copied()
        .filter(|node| in_degree.get(node).copied().unwrap_or(0) == 0)
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        sorted.push(node);
        for next in dependants.get(&node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*next);
                }
            }
        }
    }

    if sorted.len() == nodes.len() {
        Ok(sorted)
    } else {
        Err(Cycle(
            nodes.into_iter().filter(|node| !sorted.contains(node)).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtss_core::{
        atom::{group_order, FunctionAtom},
        ProgramType,
    };

    const COMMON: &str = r#"
/* Shared helpers
   for the fixed function pipeline */
#define PI 3.14159265

// Scales a vector.
vec3 scaleVec(in vec3 v, in float s)
{
    return v * s;
}

void prototypeOnly(in vec3 v);

void FFP_Transform(in mat4 m,
                   in vec4 v,
                   out vec4 o)
{
    o = m * v;
}

void FFP_Transform(in mat3 m, in vec3 v, out vec3 o)
{
    o = m * v;
}

void FFP_Scaled(in vec3 v, out vec3 o)
{
    if (v.x > 0.0) {
        o = scaleVec(normalize(v), PI);
    }
}
"#;

    fn program_calling(names: &[&str]) -> Program {
        let mut program = Program::new(ProgramType::Vertex);
        for name in names {
            program.entry_point_mut().add_atom_instance(FunctionAtom::invocation(
                *name,
                "void",
                group_order::VS_TRANSFORM,
            ));
        }
        program
    }

    #[test]
    fn test_parse_finds_definitions_and_defines() {
        let library = FunctionLibrary::parse("FFPLib_Common", COMMON);
        assert_eq!(library.defines(), ["#define PI 3.14159265"]);
        let names: Vec<&str> = library.functions().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["scaleVec", "FFP_Transform", "FFP_Transform", "FFP_Scaled"]);
        assert_eq!(library.overloads("FFP_Transform").count(), 2);

        let transform = &library.functions()[1];
        assert!(transform.source().starts_with("void FFP_Transform(in mat4 m,\n"));
        assert!(transform.source().trim_end().ends_with('}'));

        let scaled = &library.functions()[3];
        assert_eq!(scaled.calls(), ["scaleVec", "normalize"]);
        assert_eq!(scaled.return_type(), "void");
    }

    #[test]
    fn test_called_identifiers_skip_keywords_without_call() {
        assert_eq!(called_identifiers("{ a = b; if (x) { f (y); } }"), ["f"]);
    }

    #[test]
    fn test_dependencies_put_callees_first() {
        let library = Arc::new(FunctionLibrary::parse("FFPLib_Common", COMMON));
        let program = program_calling(&["FFP_Scaled"]);
        let libraries = [library];
        let order = discover_function_dependencies(&program, &libraries).unwrap();
        let names: Vec<&str> = order.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["scaleVec", "FFP_Scaled"]);
    }

    #[test]
    fn test_dependencies_include_all_overloads_once() {
        let library = Arc::new(FunctionLibrary::parse("FFPLib_Common", COMMON));
        let program = program_calling(&["FFP_Transform", "FFP_Transform"]);
        let libraries = [library];
        let order = discover_function_dependencies(&program, &libraries).unwrap();
        assert_eq!(order.len(), 2);
        assert!(order.iter().all(|f| f.name() == "FFP_Transform"));
    }

    #[test]
    fn test_calls_resolve_across_libraries() {
        let base = Arc::new(FunctionLibrary::parse(
            "Base",
            "float twice(in float x)\n{\n    return x * 2.0;\n}\n",
        ));
        let top = Arc::new(FunctionLibrary::parse(
            "Top",
            "void useTwice(in float x, out float o)\n{\n    o = twice(x);\n}\n",
        ));
        let program = program_calling(&["useTwice"]);
        let libraries = [top, base];
        let order = discover_function_dependencies(&program, &libraries).unwrap();
        let names: Vec<&str> = order.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["twice", "useTwice"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let library = Arc::new(FunctionLibrary::parse(
            "Loop",
            "void ping(in float x)\n{\n    pong(x);\n}\nvoid pong(in float x)\n{\n    ping(x);\n}\n",
        ));
        let program = program_calling(&["ping"]);
        let libraries = [library];
        let err = discover_function_dependencies(&program, &libraries).unwrap_err();
        assert!(matches!(err, WriterError::CyclicLibraryDependency(ref names) if names == "ping, pong"));
    }

    #[test]
    fn test_cache_loads_each_file_once() {
        let locator = Arc::new(MemoryLocator::new().with_source("FFPLib_Common.glsl", COMMON));
        let cache = FunctionLibraryCache::new(Arc::clone(&locator));

        let first = cache.load("FFPLib_Common", "glsl").unwrap();
        let second = cache.load("FFPLib_Common", "glsl").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(locator.open_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_reports_missing_library() {
        let cache = FunctionLibraryCache::new(MemoryLocator::new());
        let err = cache.load("Missing", "glsl").unwrap_err();
        match err {
            WriterError::LibraryNotFound { name, source } => {
                assert_eq!(name, "Missing.glsl");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_directory_locator_searches_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("FFPLib_Common.glsl"), COMMON).unwrap();
        fs::write(second.path().join("Other.glsl"), "// second").unwrap();
        fs::write(first.path().join("Other.glsl"), "// first").unwrap();

        let locator = DirectoryLocator::new([first.path(), second.path()]);
        assert_eq!(locator.paths().len(), 2);
        assert_eq!(locator.open("Other.glsl").unwrap(), "// first");

        let cache = FunctionLibraryCache::new(locator);
        let library = cache.load("FFPLib_Common", "glsl").unwrap();
        assert!(!library.functions().is_empty());
        assert!(matches!(
            cache.load("Absent", "glsl"),
            Err(WriterError::LibraryNotFound { .. })
        ));
    }
}

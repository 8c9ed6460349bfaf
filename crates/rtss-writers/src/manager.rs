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

//! Registry of program writers keyed by target language.

use crate::{
    cg::CgProgramWriter,
    error::WriterError,
    glsl::GlslProgramWriter,
    glsles::GlslEsProgramWriter,
    hlsl::HlslProgramWriter,
    library::{DirectoryLocator, FunctionLibraryCache, LibraryLocator},
    settings::WriterSettings,
    writer::{GeneratedProgram, ProgramWriter},
};
use ahash::AHashMap;
use rtss_core::{Program, ProgramSet};
use std::sync::Arc;

/// Builds a writer from the shared settings and library cache.
pub type WriterFactory =
    Box<dyn Fn(&WriterSettings, &Arc<FunctionLibraryCache>) -> Box<dyn ProgramWriter> + Send + Sync>;

/// Maps target language names to writer factories.
///
/// Built once at start-up with the `glsl`, `glsles`, `hlsl` and `cg` writers
/// registered, then shared by reference.
pub struct ProgramWriterManager {
    settings: WriterSettings,
    libraries: Arc<FunctionLibraryCache>,
    factories: AHashMap<String, WriterFactory>,
}

impl std::fmt::Debug for ProgramWriterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramWriterManager")
            .field("settings", &self.settings)
            .field("languages", &self.languages())
            .finish()
    }
}

impl ProgramWriterManager {
    /// Creates a manager reading libraries from `settings.library_paths`.
    pub fn new(settings: WriterSettings) -> Self {
        let locator = DirectoryLocator::new(settings.library_paths.clone());
        Self::with_locator(settings, locator)
    }

    /// Creates a manager reading libraries through `locator`.
    pub fn with_locator(settings: WriterSettings, locator: impl LibraryLocator + 'static) -> Self {
        let mut manager = Self {
            settings,
            libraries: Arc::new(FunctionLibraryCache::new(locator)),
            factories: AHashMap::new(),
        };

        manager.register(GlslProgramWriter::TARGET_LANGUAGE, |settings, libraries| {
            Box::new(GlslProgramWriter::new(settings.glsl_version, Arc::clone(libraries)))
        });
        manager.register(GlslEsProgramWriter::TARGET_LANGUAGE, |settings, libraries| {
            Box::new(GlslEsProgramWriter::new(settings.glsles_version, Arc::clone(libraries)))
        });
        manager.register(HlslProgramWriter::TARGET_LANGUAGE, |_, _| {
            Box::new(HlslProgramWriter::new())
        });
        manager.register(CgProgramWriter::TARGET_LANGUAGE, |_, _| Box::new(CgProgramWriter::new()));
        manager
    }

    /// Registers or replaces the factory of `language`.
    pub fn register<F>(&mut self, language: &str, factory: F)
    where
        F: Fn(&WriterSettings, &Arc<FunctionLibraryCache>) -> Box<dyn ProgramWriter> + Send + Sync + 'static,
    {
        log::debug!("Registering program writer '{}'", language);
        self.factories.insert(language.to_string(), Box::new(factory));
    }

    /// Whether a writer is registered for `language`.
    pub fn is_language_supported(&self, language: &str) -> bool {
        self.factories.contains_key(language)
    }

    /// Registered languages, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// The writer settings.
    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    /// The library cache shared by the GLSL family writers.
    pub fn library_cache(&self) -> &Arc<FunctionLibraryCache> {
        &self.libraries
    }

    /// Instantiates the writer for `language`.
    pub fn create_writer(&self, language: &str) -> Result<Box<dyn ProgramWriter>, WriterError> {
        let factory = self
            .factories
            .get(language)
            .ok_or_else(|| WriterError::UnsupportedLanguage(language.to_string()))?;
        Ok(factory(&self.settings, &self.libraries))
    }

    /// Emits the source of `program` in `language`.
    pub fn generate(&self, program: &Program, language: &str) -> Result<GeneratedProgram, WriterError> {
        let writer = self.create_writer(language)?;
        let mut source = String::new();
        writer.write_source_code(&mut source, program)?;
        log::debug!(
            "Generated {} {} lines of {}",
            program.program_type().description(),
            source.lines().count(),
            language
        );
        Ok(GeneratedProgram::new(program, writer.target_language(), source))
    }

    /// Emits every program of `set`, vertex first.
    pub fn generate_set(&self, set: &ProgramSet, language: &str) -> Result<Vec<GeneratedProgram>, WriterError> {
        set.programs().map(|program| self.generate(program, language)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryLocator;

    fn manager() -> ProgramWriterManager {
        ProgramWriterManager::with_locator(WriterSettings::default(), MemoryLocator::new())
    }

    #[test]
    fn test_builtin_languages_are_registered() {
        let manager = manager();
        assert_eq!(manager.languages(), ["cg", "glsl", "glsles", "hlsl"]);
        for language in manager.languages() {
            assert_eq!(manager.create_writer(language).unwrap().target_language(), language);
        }
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let manager = manager();
        assert!(!manager.is_language_supported("metal"));
        assert!(matches!(
            manager.create_writer("metal"),
            Err(WriterError::UnsupportedLanguage(ref name)) if name == "metal"
        ));
    }

    #[test]
    fn test_register_replaces_factory() {
        let mut manager = manager();
        manager.register("glsl", |_, libraries| Box::new(GlslProgramWriter::new(330, Arc::clone(libraries))));
        assert_eq!(manager.languages().len(), 4);
        let writer = manager.create_writer("glsl").unwrap();
        assert_eq!(writer.target_language(), "glsl");
    }
}

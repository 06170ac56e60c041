//! TypeScript declaration generation.
//!
//! With the `dts-generation` feature, [`IsolatedDeclarations`] emits `.d.ts`
//! files with OXC's isolated-declarations transform: every exported binding
//! must carry an explicit type annotation, no type checker runs.

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// A generated declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// File name of the declaration, e.g. `index.d.ts` for `index.ts`.
    pub name: String,
    pub content: String,
}

impl Declaration {
    /// Declaration file name for a TypeScript source file.
    pub fn file_name(source: &Path) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{stem}.d.ts")
    }

    /// Whether the declaration has a default export.
    pub fn has_default_export(&self) -> bool {
        self.content.contains("export default")
            || self.content.contains("as default")
    }
}

#[async_trait]
pub trait DeclarationGenerator: Send + Sync {
    /// Generate the declaration of `source`, a file of `package`.
    async fn generate(&self, package: &str, source: &Path) -> Result<Declaration>;
}

#[cfg(feature = "dts-generation")]
pub use isolated::IsolatedDeclarations;

#[cfg(feature = "dts-generation")]
mod isolated {
    use std::path::Path;

    use async_trait::async_trait;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_isolated_declarations::IsolatedDeclarationsOptions;
    use oxc_parser::Parser;
    use oxc_span::SourceType;
    use tracing::debug;

    use super::{Declaration, DeclarationGenerator};
    use crate::{Error, Result};

    #[derive(Debug, Clone, Copy, Default)]
    pub struct IsolatedDeclarations {
        /// Drop declarations marked `@internal`.
        pub strip_internal: bool,
    }

    impl IsolatedDeclarations {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DeclarationGenerator for IsolatedDeclarations {
        async fn generate(&self, package: &str, source: &Path) -> Result<Declaration> {
            let code = tokio::fs::read_to_string(source).await?;
            let strip_internal = self.strip_internal;
            let path = source.to_path_buf();

            let content = tokio::task::spawn_blocking(move || emit(&code, &path, strip_internal))
                .await
                .map_err(|e| Error::Task(e.to_string()))?
                .map_err(|message| Error::Declarations {
                    package: package.to_string(),
                    path: source.to_path_buf(),
                    message,
                })?;

            debug!(package, source = %source.display(), "generated declarations");
            Ok(Declaration {
                name: Declaration::file_name(source),
                content,
            })
        }
    }

    fn emit(code: &str, path: &Path, strip_internal: bool) -> std::result::Result<String, String> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).map_err(|e| format!("{e:?}"))?;

        let parsed = Parser::new(&allocator, code, source_type).parse();
        if !parsed.errors.is_empty() {
            return Err(join_errors(&parsed.errors));
        }

        let dts = oxc_isolated_declarations::IsolatedDeclarations::new(
            &allocator,
            IsolatedDeclarationsOptions { strip_internal },
        )
        .build(&parsed.program);
        if !dts.errors.is_empty() {
            return Err(join_errors(&dts.errors));
        }

        Ok(Codegen::new().build(&dts.program).code)
    }

    fn join_errors<E: std::fmt::Debug>(errors: &[E]) -> String {
        errors
            .iter()
            .map(|e| format!("{e:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

}

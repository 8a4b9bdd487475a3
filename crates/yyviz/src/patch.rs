//! Splicing of a state-tracing hook into generated parser code.
//!
//! Bison's skeleton prints the state stack through the `YY_STACK_PRINT`
//! macro every time the parser enters a state. The hook replaces that macro
//! with a definition that first hands the stack to a logging function, then
//! falls through to the original `yydebug` print.

use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs, io, path::Path};

/// The tracing function called by the default hook.
pub const DEFAULT_HOOK_FN: &str = "log_stack_snapshot";

/// Matches the multi-line debug definition of `YY_STACK_PRINT`, from its
/// signature to the closing `} while (0)`. The body must open with the
/// `yydebug` check, so an already hooked definition no longer matches. The
/// single-line `!YYDEBUG` stub has no body and is left alone.
const STACK_PRINT_PATTERN: &str =
    r"#[ \t]*define[ \t]+YY_STACK_PRINT\(Bottom,[ \t]*Top\)[ \t]*\\\r?\n[ \t]*do[ \t]*\{[ \t]*\\\r?\n[ \t]*if[ \t]*\(yydebug\)(?s:.*?)\}[ \t]*while[ \t]*\((?:YYID[ \t]*\()?0\)?\)";

static STACK_PRINT: Lazy<Regex> = Lazy::new(|| Regex::new(STACK_PRINT_PATTERN).unwrap());

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("IO error: {}", _0)]
    Io(#[from] io::Error),

    #[error("the hook target was not found (already patched?)")]
    NotFound,

    #[error("the hook target matched {count} times, expected exactly once")]
    Ambiguous { count: usize },

    #[error("invalid hook pattern: {}", _0)]
    InvalidPattern(#[from] regex::Error),
}

/// A fixed find-and-replace applied to generated parser source.
#[derive(Debug, Clone)]
pub struct TraceHook {
    pattern: Regex,
    replacement: String,
}

impl TraceHook {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, PatchError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    /// The hook on Bison's `YY_STACK_PRINT`, calling `hook_fn(Bottom, Top)`.
    pub fn stack_print(hook_fn: &str) -> Self {
        Self {
            pattern: STACK_PRINT.clone(),
            replacement: stack_print_replacement(hook_fn),
        }
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replaces the single occurrence of the target in `source`.
    ///
    /// Everything outside the matched block is kept byte for byte.
    pub fn apply(&self, source: &str) -> Result<String, PatchError> {
        let mut matches = self.pattern.find_iter(source);
        let found = matches.next().ok_or(PatchError::NotFound)?;
        let extra = matches.count();
        if extra > 0 {
            return Err(PatchError::Ambiguous { count: extra + 1 });
        }
        tracing::debug!("hook target found at {:?}", found.range());

        let mut patched = String::with_capacity(source.len() + self.replacement.len());
        patched.push_str(&source[..found.start()]);
        patched.push_str(&self.replacement);
        patched.push_str(&source[found.end()..]);
        Ok(patched)
    }
}

impl Default for TraceHook {
    fn default() -> Self {
        Self::stack_print(DEFAULT_HOOK_FN)
    }
}

fn stack_print_replacement(hook_fn: &str) -> String {
    let lines = [
        "# define YY_STACK_PRINT(Bottom, Top)".to_owned(),
        "do {".to_owned(),
        format!("  {} ((Bottom), (Top));", hook_fn),
        "  if (yydebug)".to_owned(),
        "    yy_stack_print ((Bottom), (Top));".to_owned(),
    ];
    let mut out = String::new();
    for line in &lines {
        out.push_str(&format!("{:<60}\\\n", line));
    }
    out.push_str("} while (0)");
    out
}

/// Patches the file in place.
///
/// Nothing is written unless the hook matched exactly once. With `backup`,
/// the original content is kept next to it as `<file>.bak`.
pub fn patch_file(path: impl AsRef<Path>, hook: &TraceHook, backup: bool) -> Result<(), PatchError> {
    let path = path.as_ref();
    let span = tracing::trace_span!("patch_file", path = %path.display());
    let _entered = span.enter();

    let source = fs::read_to_string(path)?;
    let patched = hook.apply(&source)?;

    if backup {
        let mut backup_file = path.as_os_str().to_owned();
        backup_file.push(".bak");
        fs::copy(path, &backup_file)?;
        tracing::debug!("backup written to {:?}", backup_file);
    }
    fs::write(path, patched)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const YACC_C: &str = "\
# define YY_SYMBOL_PRINT(Title, Kind, Value, Location)                    \\
do {                                                                      \\
  if (yydebug)                                                            \\
    {                                                                     \\
      YYFPRINTF (stderr, \"%s \", Title);                                   \\
      yy_symbol_print (stderr,                                            \\
                  Kind, Value); \\
      YYFPRINTF (stderr, \"\\n\");                                          \\
    }                                                                     \\
} while (0)

# define YY_STACK_PRINT(Bottom, Top)                            \\
do {                                                            \\
  if (yydebug)                                                  \\
    yy_stack_print ((Bottom), (Top));                           \\
} while (0)

# define YY_REDUCE_PRINT(Rule)          \\
do {                                    \\
  if (yydebug)                          \\
    yy_reduce_print (yyssp, yyvsp, Rule); \\
} while (0)

#else /* !YYDEBUG */
# define YYDPRINTF(Args) ((void) 0)
# define YY_SYMBOL_PRINT(Title, Kind, Value, Location)
# define YY_STACK_PRINT(Bottom, Top)
# define YY_REDUCE_PRINT(Rule)
#endif /* !YYDEBUG */
";

    #[test]
    fn patch_once() {
        let hook = TraceHook::default();
        let patched = hook.apply(YACC_C).unwrap();

        assert_eq!(patched.matches(hook.replacement()).count(), 1);
        assert!(patched.contains("  log_stack_snapshot ((Bottom), (Top));"));

        let start = YACC_C.find("# define YY_STACK_PRINT(Bottom, Top)  ").unwrap();
        assert_eq!(&patched[..start], &YACC_C[..start]);

        let tail = "\n\n# define YY_REDUCE_PRINT(Rule)          \\";
        let tail_start = YACC_C.find(tail).unwrap();
        assert!(patched.ends_with(&YACC_C[tail_start..]));

        // the !YYDEBUG stub is untouched
        assert!(patched.contains("# define YY_STACK_PRINT(Bottom, Top)\n# define YY_REDUCE_PRINT"));
    }

    #[test]
    fn second_run_finds_nothing() {
        let hook = TraceHook::default();
        let patched = hook.apply(YACC_C).unwrap();
        assert!(matches!(hook.apply(&patched), Err(PatchError::NotFound)));
    }

    #[test]
    fn ambiguous_target() {
        let source = format!("{}\n{}", YACC_C, YACC_C);
        let err = TraceHook::default().apply(&source).unwrap_err();
        assert!(matches!(err, PatchError::Ambiguous { count: 2 }));
    }

    #[test]
    fn old_skeleton_with_yyid() {
        let source = "\
# define YY_STACK_PRINT(Bottom, Top)\t\t\t\t\\
do {\t\t\t\t\t\t\t\t\\
  if (yydebug)\t\t\t\t\t\t\t\\
    yy_stack_print ((Bottom), (Top));\t\t\t\t\\
} while (YYID (0))
";
        let patched = TraceHook::default().apply(source).unwrap();
        assert!(patched.contains("log_stack_snapshot"));
        assert!(patched.ends_with("} while (0)\n"));
    }

    #[test]
    fn custom_hook_fn() {
        let patched = TraceHook::stack_print("trace_states").apply(YACC_C).unwrap();
        assert!(patched.contains("  trace_states ((Bottom), (Top));"));
        assert!(!patched.contains("log_stack_snapshot"));
    }

    #[test]
    fn replacement_is_literal() {
        let hook = TraceHook::new(r"MARK", "$1 ${x}").unwrap();
        assert_eq!(hook.apply("a MARK b").unwrap(), "a $1 ${x} b");
    }

    #[test]
    fn invalid_pattern() {
        assert!(matches!(
            TraceHook::new("(", ""),
            Err(PatchError::InvalidPattern(..))
        ));
    }
}

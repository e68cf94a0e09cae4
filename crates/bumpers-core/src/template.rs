//! Message template rendering
//!
//! `send` strings are Go-style templates: `{{ }}` actions over a small
//! context map plus a handful of helpers. There is deliberately no control
//! flow. An action is either a context key (`{{.Today}}`, `{{.Command}}`)
//! or a helper call (`{{readFile "notes.md"}}`, `{{argv 0}}`).
//!
//! The filesystem helpers are sandboxed to the project root: paths are
//! cleaned, absolutized, and symlink-resolved, then checked for containment
//! component-wise (so `/home/userA` never authorizes `/home/userAB`). Any
//! failure or escape attempt renders as the empty/false value; helpers never
//! error outward.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::constants::MAX_TEMPLATE_BYTES;
use crate::error::TemplateError;

/// Context map a template is rendered against.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    /// Local date as YYYY-MM-DD, always available
    pub today: String,
    /// The matched content text, set for rule matches
    pub command: Option<String>,
    /// Command name, set for `%name` invocations
    pub name: Option<String>,
    /// Raw argument remainder for `%name` invocations
    pub args: Option<String>,
    /// Whitespace-tokenized arguments
    pub argv: Vec<String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self {
            today: Local::now().format("%Y-%m-%d").to_string(),
            command: None,
            name: None,
            args: None,
            argv: Vec::new(),
        }
    }

    /// Context for a rule hit: `.Command` carries the matched text.
    pub fn for_rule(matched: &str) -> Self {
        Self {
            command: Some(matched.to_string()),
            ..Self::new()
        }
    }

    /// Context for a `%name args` command invocation.
    pub fn for_command(name: &str, args: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            args: Some(args.to_string()),
            argv: args.split_whitespace().map(str::to_string).collect(),
            ..Self::new()
        }
    }

    fn lookup(&self, key: &str) -> Result<String, TemplateError> {
        match key {
            "Today" => Ok(self.today.clone()),
            "Command" => Ok(self.command.clone().unwrap_or_default()),
            "Name" => Ok(self.name.clone().unwrap_or_default()),
            "Args" => Ok(self.args.clone().unwrap_or_default()),
            "Argv" => Ok(self.argv.join(" ")),
            other => Err(TemplateError::UnknownKey {
                name: other.to_string(),
            }),
        }
    }
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One parsed argument of a helper call.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Key(String),
}

/// Template renderer bound to a project root.
#[derive(Debug, Clone)]
pub struct Renderer {
    root: PathBuf,
}

impl Renderer {
    /// Create a renderer sandboxed to `root`. The root is resolved eagerly
    /// so later containment checks compare canonical paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = dunce::canonicalize(&root).unwrap_or_else(|_| path_clean::clean(&root));
        Self { root }
    }

    /// Expand every `{{ }}` action in `template` against `ctx`.
    pub fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
        if template.len() > MAX_TEMPLATE_BYTES {
            return Err(TemplateError::TooLarge {
                bytes: template.len(),
                max: MAX_TEMPLATE_BYTES,
            });
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| TemplateError::Parse {
                reason: "unclosed {{ action".to_string(),
            })?;
            out.push_str(&self.eval(after[..end].trim(), ctx)?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn eval(&self, action: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
        if action.is_empty() {
            return Err(TemplateError::Parse {
                reason: "empty {{ }} action".to_string(),
            });
        }
        if let Some(key) = action.strip_prefix('.') {
            return ctx.lookup(key);
        }

        let tokens = tokenize(action)?;
        let Some(Token::Ident(name)) = tokens.first() else {
            return Err(TemplateError::Parse {
                reason: format!("expected function name in action: {action}"),
            });
        };
        let args = &tokens[1..];

        match name.as_str() {
            "readFile" => Ok(self.read_file(&self.string_arg("readFile", args, ctx)?)),
            "testPath" => Ok(self
                .test_path(&self.string_arg("testPath", args, ctx)?)
                .to_string()),
            "argc" => {
                if !args.is_empty() {
                    return Err(TemplateError::BadArgument {
                        function: "argc".to_string(),
                        reason: "takes no arguments".to_string(),
                    });
                }
                Ok(ctx.argv.len().to_string())
            }
            "argv" => {
                let [Token::Int(index)] = args else {
                    return Err(TemplateError::BadArgument {
                        function: "argv".to_string(),
                        reason: "expected one integer index".to_string(),
                    });
                };
                let value = usize::try_from(*index)
                    .ok()
                    .and_then(|i| ctx.argv.get(i))
                    .cloned()
                    .unwrap_or_default();
                Ok(value)
            }
            other => Err(TemplateError::UnknownFunction {
                name: other.to_string(),
            }),
        }
    }

    fn string_arg(
        &self,
        function: &str,
        args: &[Token],
        ctx: &TemplateContext,
    ) -> Result<String, TemplateError> {
        match args {
            [Token::Str(s)] => Ok(s.clone()),
            [Token::Key(key)] => ctx.lookup(key),
            _ => Err(TemplateError::BadArgument {
                function: function.to_string(),
                reason: "expected one string argument".to_string(),
            }),
        }
    }

    /// Resolve a helper path and enforce project-root containment.
    ///
    /// Returns `None` for empty paths and anything resolving outside the
    /// root after cleaning and symlink resolution.
    fn resolve(&self, relpath: &str) -> Option<PathBuf> {
        if relpath.is_empty() {
            return None;
        }
        let raw = Path::new(relpath);
        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.root.join(raw)
        };
        let cleaned = path_clean::clean(&joined);
        let resolved = dunce::canonicalize(&cleaned).unwrap_or(cleaned);

        // Component-wise containment; Path::starts_with never treats
        // "/home/userAB" as inside "/home/userA".
        if resolved == self.root || resolved.starts_with(&self.root) {
            Some(resolved)
        } else {
            None
        }
    }

    /// `readFile` helper: project-contained read. UTF-8 content is returned
    /// as-is; anything else as a base64 data URL; any failure as "".
    fn read_file(&self, relpath: &str) -> String {
        let Some(path) = self.resolve(relpath) else {
            return String::new();
        };
        let Ok(bytes) = std::fs::read(&path) else {
            return String::new();
        };
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => format!(
                "data:application/octet-stream;base64,{}",
                BASE64.encode(err.as_bytes())
            ),
        }
    }

    /// `testPath` helper: project-contained existence check.
    fn test_path(&self, relpath: &str) -> bool {
        self.resolve(relpath).is_some_and(|path| path.exists())
    }
}

fn tokenize(action: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut chars = action.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => value.push(escaped),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        other => {
                            return Err(TemplateError::Parse {
                                reason: format!("bad escape in string literal: {other:?}"),
                            });
                        }
                    },
                    Some(ch) => value.push(ch),
                    None => {
                        return Err(TemplateError::Parse {
                            reason: "unterminated string literal".to_string(),
                        });
                    }
                }
            }
            tokens.push(Token::Str(value));
        } else if c == '.' {
            chars.next();
            let key: String = take_while(&mut chars, |ch| ch.is_alphanumeric() || ch == '_');
            if key.is_empty() {
                return Err(TemplateError::Parse {
                    reason: "bare '.' in action".to_string(),
                });
            }
            tokens.push(Token::Key(key));
        } else if c.is_ascii_digit() || c == '-' {
            let raw: String = take_while(&mut chars, |ch| ch.is_ascii_digit() || ch == '-');
            let value = raw.parse::<i64>().map_err(|_| TemplateError::Parse {
                reason: format!("bad integer literal: {raw}"),
            })?;
            tokens.push(Token::Int(value));
        } else if c.is_alphanumeric() || c == '_' {
            let ident: String = take_while(&mut chars, |ch| ch.is_alphanumeric() || ch == '_');
            tokens.push(Token::Ident(ident));
        } else {
            return Err(TemplateError::Parse {
                reason: format!("unexpected character in action: {c}"),
            });
        }
    }

    Ok(tokens)
}

fn take_while(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    pred: impl Fn(char) -> bool,
) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if pred(c) {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

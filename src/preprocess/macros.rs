//! Macro definitions and the insertion-ordered macro table.
//!
//! A `#define` is parsed once into a [`MacroDefinition`] whose body is a
//! template of literal runs and parameter references. Function-like bodies are
//! scanned for `#param` (stringize) and `a##b` (concatenation); object-like
//! bodies are stored verbatim, trimmed.

use indexmap::IndexMap;

use super::Diagnostic;
use crate::core::AddonError;

/// Warning name for a `##` that joins nothing.
pub const EXCESSIVE_CONCATENATION: &str = "excessive-concatenation";

/// Warning name for a `#define` of an already defined macro.
pub const REDEFINITION: &str = "redefinition-wo-undef";

/// Whether `b` can be part of a macro name or parameter.
#[must_use]
pub const fn is_macro_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// One piece of a macro body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied as-is
    Literal(String),
    /// Reference to `parameters[index]`
    Param {
        /// Index into [`MacroDefinition::parameters`]
        index: usize,
        /// Whether the argument is wrapped in quotes (`#param`)
        stringize: bool,
    },
}

/// A parsed `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    /// Macro name
    pub name: String,
    /// Parameter names, in declaration order
    pub parameters: Vec<String>,
    /// Whether the name was followed by a parameter list, even an empty one
    pub function_like: bool,
    /// Body template; parameter references always index into `parameters`
    pub template: Vec<Segment>,
    /// Physical line of the `#define`
    pub defined_at_line: usize,
}

impl MacroDefinition {
    /// An object-like macro with a literal body.
    #[must_use]
    pub fn object(name: impl Into<String>, body: &str) -> Self {
        let body = body.trim();
        Self {
            name: name.into(),
            parameters: Vec::new(),
            function_like: false,
            template: if body.is_empty() {
                Vec::new()
            } else {
                vec![Segment::Literal(body.to_string())]
            },
            defined_at_line: 0,
        }
    }

    /// Number of arguments an invocation must supply.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// Macros visible to one compile, in definition order.
///
/// Redefining a name moves it to the end, as if it had been removed first.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: IndexMap<String, MacroDefinition>,
}

impl MacroTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `definition`, returning the definition it replaced.
    pub fn define(&mut self, definition: MacroDefinition) -> Option<MacroDefinition> {
        let previous = self.entries.shift_remove(&definition.name);
        self.entries.insert(definition.name.clone(), definition);
        previous
    }

    /// Removes `name`, returning its definition if it was defined.
    pub fn undef(&mut self, name: &str) -> Option<MacroDefinition> {
        self.entries.shift_remove(name)
    }

    /// Looks up a macro by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.entries.get(name)
    }

    /// Whether `name` is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of defined macros.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no macros are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definitions in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.entries.values()
    }
}

#[derive(Default)]
struct TemplateBuilder {
    segments: Vec<Segment>,
}

impl TemplateBuilder {
    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    fn push_param(&mut self, index: usize, stringize: bool) {
        self.segments.push(Segment::Param { index, stringize });
    }

    fn trim_end(&mut self) {
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            let trimmed = last.trim_end_matches([' ', '\t']).len();
            last.truncate(trimmed);
            if last.is_empty() {
                self.segments.pop();
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Parses the text after `#define`.
///
/// Redundant `##` at the edges of a body are reported through `warnings`;
/// callers decide whether the warning is muted.
pub fn parse_define(
    text: &str,
    file: &str,
    line: usize,
    warnings: &mut Vec<Diagnostic>,
) -> Result<MacroDefinition, AddonError> {
    let malformed = |reason: &str| AddonError::MalformedDirective {
        directive: "define".to_string(),
        reason: reason.to_string(),
        file: file.to_string(),
        line,
    };

    let name_len = text.bytes().take_while(|b| is_macro_byte(*b)).count();
    if name_len == 0 {
        return Err(malformed("missing macro name"));
    }
    let name = &text[..name_len];
    let rest = &text[name_len..];

    let Some(after_paren) = rest.strip_prefix('(') else {
        let mut definition = MacroDefinition::object(name, rest);
        definition.defined_at_line = line;
        return Ok(definition);
    };

    let close = after_paren
        .find(')')
        .ok_or_else(|| malformed("missing ')' after parameter list"))?;
    let parameters: Vec<String> = if after_paren[..close].trim().is_empty() {
        Vec::new()
    } else {
        after_paren[..close]
            .split(',')
            .map(|p| p.trim().to_string())
            .collect()
    };
    if let Some(bad) = parameters
        .iter()
        .find(|p| p.is_empty() || !p.bytes().all(is_macro_byte))
    {
        return Err(malformed(&format!("invalid parameter name '{bad}'")));
    }

    let body = &after_paren[close + 1..];
    let template = parse_template(name, &parameters, body, file, line, warnings)?;

    Ok(MacroDefinition {
        name: name.to_string(),
        parameters,
        function_like: true,
        template,
        defined_at_line: line,
    })
}

fn parse_template(
    name: &str,
    parameters: &[String],
    body: &str,
    file: &str,
    line: usize,
    warnings: &mut Vec<Diagnostic>,
) -> Result<Vec<Segment>, AddonError> {
    let invalid = |reason: &str| AddonError::InvalidMacro {
        name: name.to_string(),
        reason: reason.to_string(),
        file: file.to_string(),
        line,
    };
    let warn = |warnings: &mut Vec<Diagnostic>, message: &str| {
        warnings.push(Diagnostic {
            name: EXCESSIVE_CONCATENATION,
            message: message.to_string(),
            file: file.to_string(),
            line,
        });
    };
    let param_index = |ident: &str| parameters.iter().position(|p| p == ident);

    let body = body.trim_start_matches([' ', '\t']);
    let bytes = body.as_bytes();
    let mut template = TemplateBuilder::default();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && !is_macro_byte(bytes[i]) && bytes[i] != b'#' {
            i += 1;
        }
        template.push_literal(&body[start..i]);
        if i >= bytes.len() {
            break;
        }

        if bytes[i] == b'#' {
            if bytes.get(i + 1) == Some(&b'#') {
                i += 2;
                if template.is_empty() {
                    warn(warnings, "Leading token concatenation operators (##) are not necessary");
                }
                template.trim_end();
                while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
                    i += 1;
                }
                if i >= bytes.len() {
                    warn(warnings, "Trailing token concatenation operators (##) are not necessary");
                }
                continue;
            }

            i += 1;
            let ident_start = i;
            while i < bytes.len() && is_macro_byte(bytes[i]) {
                i += 1;
            }
            if ident_start == i {
                template.push_literal("#");
                continue;
            }
            let ident = &body[ident_start..i];
            let index = param_index(ident)
                .ok_or_else(|| invalid("Stringizing is only allowed for arguments"))?;
            if body[i..].starts_with("##") {
                return Err(invalid("Token concatenations cannot be stringized"));
            }
            template.push_param(index, true);
            continue;
        }

        let ident_start = i;
        while i < bytes.len() && is_macro_byte(bytes[i]) {
            i += 1;
        }
        let ident = &body[ident_start..i];
        match param_index(ident) {
            Some(index) => template.push_param(index, false),
            None => template.push_literal(ident),
        }
    }

    template.trim_end();
    Ok(template.segments)
}

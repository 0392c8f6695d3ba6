//! Macro expansion.
//!
//! Arguments are expanded before they are substituted, and the substituted
//! body is expanded again before it is spliced into the output. While a
//! macro's own body is being re-expanded its name is disabled, so a macro that
//! mentions itself stops instead of recursing forever. [`expand`] repeats whole
//! passes over the text until it stops changing.

use super::macros::{MacroDefinition, MacroTable, Segment, is_macro_byte};
use crate::constants::MAX_EXPANSION_PASSES;
use crate::core::AddonError;

/// Position used for error messages and the `__FILE__`/`__LINE__` builtins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Display name of the source file
    pub file: String,
    /// Physical line number
    pub line: usize,
}

/// Expands `text` until it reaches a fixpoint.
pub fn expand(text: &str, table: &MacroTable, location: &Location) -> Result<String, AddonError> {
    let mut current = text.to_string();
    for _ in 0..MAX_EXPANSION_PASSES {
        let next = Expander::new(table, location).expand_once(&current)?;
        if next == current {
            return Ok(next);
        }
        current = next;
    }

    Err(AddonError::MacroRecursion {
        file: location.file.clone(),
        line: location.line,
    })
}

struct Expander<'a> {
    table: &'a MacroTable,
    location: &'a Location,
    disabled: Vec<&'a str>,
}

impl<'a> Expander<'a> {
    fn new(table: &'a MacroTable, location: &'a Location) -> Self {
        Self {
            table,
            location,
            disabled: Vec::new(),
        }
    }

    fn expand_once(&mut self, text: &str) -> Result<String, AddonError> {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < bytes.len() {
            let start = i;
            while i < bytes.len() && !is_macro_byte(bytes[i]) {
                i += 1;
            }
            out.push_str(&text[start..i]);
            if i >= bytes.len() {
                break;
            }

            let ident_start = i;
            while i < bytes.len() && is_macro_byte(bytes[i]) {
                i += 1;
            }
            let ident = &text[ident_start..i];

            let table = self.table;
            let Some(definition) = table
                .get(ident)
                .filter(|_| !self.disabled.iter().any(|name| *name == ident))
            else {
                match self.builtin(ident) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(ident),
                }
                continue;
            };

            let arguments = if definition.function_like {
                if bytes.get(i) != Some(&b'(') {
                    out.push_str(ident);
                    continue;
                }
                let (raw, end) = self.scan_arguments(text, i + 1, ident)?;
                i = end;
                self.expand_arguments(definition, raw)?
            } else {
                Vec::new()
            };

            let substituted = substitute(definition, &arguments);
            self.disabled.push(&definition.name);
            let expanded = self.expand_once(&substituted);
            self.disabled.pop();
            out.push_str(expanded?.trim());
        }

        Ok(out)
    }

    fn expand_arguments(
        &mut self,
        definition: &MacroDefinition,
        raw: Vec<&str>,
    ) -> Result<Vec<String>, AddonError> {
        let given = if definition.arity() == 0 && raw.len() == 1 && raw[0].trim().is_empty() {
            0
        } else {
            raw.len()
        };
        if given != definition.arity() {
            return Err(AddonError::ArgumentCountMismatch {
                name: definition.name.clone(),
                expected: definition.arity(),
                given,
                file: self.location.file.clone(),
                line: self.location.line,
            });
        }

        raw.into_iter()
            .take(given)
            .map(|arg| self.expand_once(arg).map(|s| s.trim().to_string()))
            .collect()
    }

    /// Splits a parenthesized argument list starting just after `(`.
    ///
    /// Returns the raw arguments and the index just past the closing `)`.
    fn scan_arguments<'t>(
        &self,
        text: &'t str,
        start: usize,
        name: &str,
    ) -> Result<(Vec<&'t str>, usize), AddonError> {
        let bytes = text.as_bytes();
        let mut arguments = Vec::new();
        let mut level = 0usize;
        let mut quote: Option<u8> = None;
        let mut arg_start = start;

        for i in start..bytes.len() {
            let c = bytes[i];
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
            } else if (c == b'"' || c == b'\'') && bytes[i - 1] != b'\\' {
                quote = Some(c);
            } else if c == b'(' {
                level += 1;
            } else if c == b')' && level > 0 {
                level -= 1;
            } else if level == 0 && (c == b',' || c == b')') {
                arguments.push(&text[arg_start..i]);
                arg_start = i + 1;
                if c == b')' {
                    return Ok((arguments, i + 1));
                }
            }
        }

        Err(AddonError::UnterminatedArguments {
            name: name.to_string(),
            file: self.location.file.clone(),
            line: self.location.line,
        })
    }

    fn builtin(&self, ident: &str) -> Option<String> {
        match ident {
            "__LINE__" => Some(self.location.line.to_string()),
            "__FILE__" => Some(format!("\"{}\"", self.location.file)),
            _ => None,
        }
    }
}

/// Fills a macro's template with already expanded arguments.
fn substitute(definition: &MacroDefinition, arguments: &[String]) -> String {
    let mut out = String::new();
    for segment in &definition.template {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Param {
                index,
                stringize: true,
            } => {
                out.push('"');
                out.push_str(strip_quotes(&arguments[*index]));
                out.push('"');
            }
            Segment::Param {
                index,
                stringize: false,
            } => {
                let argument = &arguments[*index];
                if inside_string(&out) {
                    out.push_str(strip_quotes(argument));
                } else {
                    out.push_str(argument);
                }
            }
        }
    }
    out
}

/// Removes one pair of surrounding double quotes.
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Whether the end of `text` lies inside a double-quoted string.
fn inside_string(text: &str) -> bool {
    text.bytes().filter(|b| *b == b'"').count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::macros::parse_define;

    fn table(defines: &[&str]) -> MacroTable {
        let mut table = MacroTable::new();
        for define in defines {
            let def = parse_define(define, "test.hpp", 1, &mut Vec::new()).unwrap();
            table.define(def);
        }
        table
    }

    fn loc() -> Location {
        Location {
            file: "test.hpp".to_string(),
            line: 7,
        }
    }

    fn run(defines: &[&str], text: &str) -> Result<String, AddonError> {
        expand(text, &table(defines), &loc())
    }

    #[test]
    fn test_square_substitutes_verbatim() {
        assert_eq!(run(&["SQ(x) ((x)*(x))"], "SQ(2+3)").unwrap(), "((2+3)*(2+3))");
    }

    #[test]
    fn test_arguments_expand_before_stringizing() {
        assert_eq!(
            run(&["NAME foo", "STR(x) #x"], "STR(NAME)").unwrap(),
            "\"foo\""
        );
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(run(&["CAT(a,b) a##b"], "CAT(foo,bar)").unwrap(), "foobar");
    }

    #[test]
    fn test_arity_mismatch() {
        let err = run(&["CAT(a,b) a##b"], "CAT(foo)").unwrap_err();
        assert_eq!(
            err,
            AddonError::ArgumentCountMismatch {
                name: "CAT".to_string(),
                expected: 2,
                given: 1,
                file: "test.hpp".to_string(),
                line: 7,
            }
        );
        assert!(run(&["ONE(a) a"], "ONE(1,2,3)").is_err());
        assert!(run(&["NONE() 0"], "NONE(1)").is_err());
    }

    #[test]
    fn test_empty_invocation_of_zero_parameter_macro() {
        assert_eq!(run(&["NOW() 42"], "x = NOW();").unwrap(), "x = 42;");
    }

    #[test]
    fn test_function_like_without_parens_is_literal() {
        assert_eq!(run(&["F(a) a"], "F + F (1)").unwrap(), "F + F (1)");
    }

    #[test]
    fn test_object_like_leaves_parens() {
        assert_eq!(run(&["A 1"], "A(2)").unwrap(), "1(2)");
    }

    #[test]
    fn test_nested_macros_and_commas_in_parens() {
        let defines = [
            "PREFIX cba",
            "DOUBLES(a,b) a##_##b",
            "GVAR(v) DOUBLES(PREFIX,v)",
            "FIRST(a,b) a",
        ];
        assert_eq!(run(&defines, "GVAR(enabled) = 1;").unwrap(), "cba_enabled = 1;");
        assert_eq!(run(&defines, "FIRST((1,2),3)").unwrap(), "(1,2)");
    }

    #[test]
    fn test_quoted_arguments_are_opaque() {
        assert_eq!(
            run(&["FIRST(a,b) a"], "FIRST(\"x,)y\", 2)").unwrap(),
            "\"x,)y\""
        );
    }

    #[test]
    fn test_stringize_strips_existing_quotes() {
        assert_eq!(run(&["Q(x) #x"], "Q(\"done\")").unwrap(), "\"done\"");
    }

    #[test]
    fn test_parameter_inside_string_literal() {
        assert_eq!(
            run(&["PATH(f) \"\\a\\f.paa\""], "PATH(\"img\")").unwrap(),
            "\"\\a\\img.paa\""
        );
    }

    #[test]
    fn test_names_inside_quoted_text_expand() {
        assert_eq!(run(&["NAME foo"], "title = \"NAME\";").unwrap(), "title = \"foo\";");
    }

    #[test]
    fn test_unterminated_arguments() {
        let err = run(&["F(a) a"], "F(1, (2)").unwrap_err();
        assert!(matches!(err, AddonError::UnterminatedArguments { .. }));
    }

    #[test]
    fn test_self_reference_terminates() {
        assert_eq!(run(&["A A"], "A").unwrap(), "A");
        assert_eq!(run(&["A B", "B A"], "A").unwrap(), "A");
    }

    #[test]
    fn test_growing_expansion_fails() {
        let err = run(&["A x A"], "A").unwrap_err();
        assert!(matches!(err, AddonError::MacroRecursion { .. }));
    }

    #[test]
    fn test_fixpoint_picks_up_late_invocations() {
        assert_eq!(run(&["F(a) <a>", "G F"], "G(1)").unwrap(), "<1>");
    }

    #[test]
    fn test_builtins() {
        assert_eq!(run(&[], "__LINE__ __FILE__").unwrap(), "7 \"test.hpp\"");
        assert_eq!(run(&["__LINE__ 1"], "__LINE__").unwrap(), "1");
    }
}

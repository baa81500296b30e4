//! Boundary check for a component's logic section.
//!
//! A component exports its logic either through `export default { ... }` or
//! through root level `this.x = ...` statements. Mixing both is an error.

use log::debug;
use oxc_allocator::Allocator;
use oxc_ast::ast::{AssignmentTarget, Expression, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};

use crate::validate::{CompilerError, ERR_EXPRESSION_SYNTAX, ERR_MIXED_EXPORT_STYLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportStyle {
    /// `export default` statement.
    Modern,
    /// Root level statements on `this`.
    Legacy,
    None,
}

fn is_this_member(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::StaticMemberExpression(m) => matches!(m.object, Expression::ThisExpression(_)),
        Expression::ComputedMemberExpression(m) => {
            matches!(m.object, Expression::ThisExpression(_))
        }
        _ => false,
    }
}

fn is_this_statement(statement: &Statement<'_>) -> bool {
    let Statement::ExpressionStatement(stmt) = statement else {
        return false;
    };
    match &stmt.expression {
        Expression::AssignmentExpression(assign) => match &assign.left {
            AssignmentTarget::StaticMemberExpression(m) => {
                matches!(m.object, Expression::ThisExpression(_))
            }
            AssignmentTarget::ComputedMemberExpression(m) => {
                matches!(m.object, Expression::ThisExpression(_))
            }
            _ => false,
        },
        Expression::CallExpression(call) => is_this_member(&call.callee),
        _ => false,
    }
}

pub fn check_export_style(script: &str, file: &str) -> Result<ExportStyle, CompilerError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(true);
    let ret = Parser::new(&allocator, script, source_type).parse();

    if let Some(error) = ret.errors.first() {
        return Err(CompilerError::new(
            ERR_EXPRESSION_SYNTAX,
            &format!("Invalid script syntax: {}", error),
            file,
            1,
            1,
        ));
    }

    let body = &ret.program.body;
    let export_default = body
        .iter()
        .any(|statement| matches!(statement, Statement::ExportDefaultDeclaration(_)));
    let root_this = body.iter().any(is_this_statement);

    let style = match (export_default, root_this) {
        (true, true) => {
            return Err(CompilerError::with_details(
                ERR_MIXED_EXPORT_STYLE,
                "You can't use \"export default {}\" and root this statements in the same component.",
                file,
                1,
                1,
                None,
                vec!["Move the root `this` statements into the exported object.".to_string()],
            ))
        }
        (true, false) => ExportStyle::Modern,
        (false, true) => ExportStyle::Legacy,
        (false, false) => ExportStyle::None,
    };

    debug!("{}: script export style {:?}", file, style);
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_export() {
        let style = check_export_style("import a from 'a'\nexport default { a }", "c.riot");
        assert_eq!(style, Ok(ExportStyle::Modern));
    }

    #[test]
    fn test_legacy_statements() {
        let style = check_export_style("this.count = 0\nthis.on('mount', () => {})", "c.riot");
        assert_eq!(style, Ok(ExportStyle::Legacy));
    }

    #[test]
    fn test_plain_script() {
        assert_eq!(check_export_style("const a = 1", ""), Ok(ExportStyle::None));
    }

    #[test]
    fn test_mixed_styles_fail() {
        let error = check_export_style("this.count = 0\nexport default {}", "c.riot").unwrap_err();
        assert_eq!(error.error_type, "MixedExportStyleError");
        assert_eq!(error.file, "c.riot");
    }

    #[test]
    fn test_nested_this_is_not_root() {
        let script = "export default { onMounted() { this.count = 1 } }";
        assert_eq!(check_export_style(script, ""), Ok(ExportStyle::Modern));
    }
}

//! Export of a fitted forest as standalone C source.
//!
//! The output is self-contained: the two vector helpers plus one prediction
//! function whose trees are nested `if/else` chains. Each tree fills a local
//! distribution vector; the vectors are summed with `add_vectors` and scaled
//! by the reciprocal tree count with `mul_vector_number`.

use crate::error::{Error, Result};
use crate::model::tree::Node;
use crate::model::{DecisionTree, RandomForest};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Render the header declaring the generated surface.
pub fn export_header(function_name: &str) -> String {
    format!(
        "#ifndef HELPERS_H\n\
         #define HELPERS_H\n\
         \n\
         // Function declarations\n\
         void add_vectors(double *v1, double *v2, int size, double *result);\n\
         void mul_vector_number(double *v1, double num, int size, double *result);\n\
         void {function_name}(double *input, double *output);\n\
         \n\
         #endif\n"
    )
}

const HELPER_DEFINITIONS: &str = "\
void add_vectors(double *v1, double *v2, int size, double *result) {
    for (int i = 0; i < size; ++i) {
        result[i] = v1[i] + v2[i];
    }
}

void mul_vector_number(double *v1, double num, int size, double *result) {
    for (int i = 0; i < size; ++i) {
        result[i] = v1[i] * num;
    }
}
";

/// Render a fitted forest as a C translation unit with the given entry-point
/// name.
pub fn export_to_c(forest: &RandomForest, function_name: &str) -> Result<String> {
    if !forest.is_fitted() {
        return Err(Error::NotFitted);
    }

    let num_classes = forest.num_classes();
    let num_trees = forest.trees().len();
    let mut out = String::new();

    out.push_str("#include <string.h>\n\n");
    out.push_str(HELPER_DEFINITIONS);
    out.push('\n');

    // fmt::Write on String cannot fail.
    let _ = writeln!(out, "void {function_name}(double * input, double * output) {{");

    for (idx, tree) in forest.trees().iter().enumerate() {
        let _ = writeln!(out, "    double var{idx}[{num_classes}];");
        emit_node(&mut out, tree, 0, idx, num_classes, 1);
    }

    for idx in 1..num_trees {
        let _ = writeln!(out, "    add_vectors(var0, var{idx}, {num_classes}, var0);");
    }
    let _ = writeln!(
        out,
        "    mul_vector_number(var0, {:?}, {num_classes}, output);",
        1.0 / num_trees as f64
    );
    out.push_str("}\n");

    Ok(out)
}

fn emit_node(
    out: &mut String,
    tree: &DecisionTree,
    node: usize,
    var: usize,
    num_classes: usize,
    depth: usize,
) {
    let pad = "    ".repeat(depth);

    match &tree.nodes()[node] {
        Node::Leaf { distribution } => {
            let values = distribution
                .iter()
                .map(|v| format!("{v:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "{pad}memcpy(var{var}, (double[]){{{values}}}, {num_classes} * sizeof(double));"
            );
        }
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let _ = writeln!(out, "{pad}if (input[{feature}] <= {threshold:?}) {{");
            emit_node(out, tree, *left as usize, var, num_classes, depth + 1);
            let _ = writeln!(out, "{pad}}} else {{");
            emit_node(out, tree, *right as usize, var, num_classes, depth + 1);
            let _ = writeln!(out, "{pad}}}");
        }
    }
}

/// Write the generated C source and its matching header next to each other.
/// The header path is the source path with an `.h` extension.
pub fn write_c_export<P: AsRef<Path>>(
    path: P,
    forest: &RandomForest,
    function_name: &str,
) -> Result<()> {
    let source = export_to_c(forest, function_name)?;
    fs::write(&path, source)?;
    fs::write(
        path.as_ref().with_extension("h"),
        export_header(function_name),
    )?;

    Ok(())
}

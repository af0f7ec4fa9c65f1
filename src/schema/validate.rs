//! Post-load consistency checks.

use super::{FieldSpec, Schema, TypeDef, TEMPLATE};
use crate::expr::precedence::{audit, PrecedenceWarning};
use crate::util::{Error, Result};

fn check_type(schema: &Schema, f: &FieldSpec) -> bool {
    schema.is_compound(&f.type_name) || schema.is_basic_type(&f.type_name) || f.type_name == TEMPLATE
}

fn check_template(schema: &Schema, f: &FieldSpec) -> bool {
    f.template.is_empty()
        || f.template == TEMPLATE
        || schema.is_basic_type(&f.template)
        || schema.is_compound(&f.template)
        || schema.is_ancestor_or_block(&f.template)
}

fn check_fields(schema: &Schema, def: &TypeDef, what: &str) -> Result<()> {
    for f in &def.fields {
        if !check_type(schema, f) {
            return Err(Error::schema(format!(
                "{what} {} refers to unknown type {:?}",
                def.name, f.type_name
            )));
        }
        if !check_template(schema, f) {
            return Err(Error::schema(format!(
                "{what} {} refers to unknown template type {:?}",
                def.name, f.template
            )));
        }
    }
    Ok(())
}

/// Reject dangling type references, bad ancestry and self-containing compounds.
pub(super) fn check(schema: &Schema) -> Result<()> {
    for c in schema.compounds_iter() {
        check_fields(schema, c, "compound")?;
        if c.fields.iter().any(|f| f.type_name == c.name) {
            return Err(Error::schema(format!("compound {} contains itself", c.name)));
        }
    }

    for b in schema.blocks_iter() {
        for a in &b.ancestors {
            if a == &b.name {
                return Err(Error::schema(format!("block {} inherits itself", b.name)));
            }
            if !schema.is_ancestor_or_block(a) {
                return Err(Error::schema(format!(
                    "block {} inherits unknown ancestor {a:?}",
                    b.name
                )));
            }
        }
        check_fields(schema, b, "block")?;
    }
    Ok(())
}

/// Collect expressions whose leftmost-split and conventional readings differ.
pub(super) fn audit_precedence(schema: &Schema) -> Vec<PrecedenceWarning> {
    let mut out = Vec::new();
    for def in schema.compounds_iter().chain(schema.blocks_iter()) {
        for f in &def.fields {
            let exprs = [("cond", &f.cond), ("vercond", &f.vercond), ("arr1", &f.arr1), ("arr2", &f.arr2)];
            for (attr, text) in exprs {
                if text.is_empty() {
                    continue;
                }
                let location = format!("{}/{} {attr}", def.name, f.name);
                if let Some(w) = audit(&location, text) {
                    tracing::warn!(
                        "{}: {:?} reads as {} but conventionally as {}",
                        w.location,
                        w.text,
                        w.leftmost,
                        w.conventional
                    );
                    out.push(w);
                }
            }
        }
    }
    out
}

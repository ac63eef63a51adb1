//! Human-readable forms of a [Record].

use std::fmt::{self, Write};

use crate::{record::Record, value::Value};

fn hex_int(v: i64) -> String {
    if v < 0 {
        format!("-{:#x}", v.unsigned_abs())
    } else {
        format!("{v:#x}")
    }
}

fn fmt_value(f: &mut impl Write, value: &Value) -> fmt::Result {
    match value {
        Value::U64(v) => write!(f, "{v:#x}"),
        Value::I64(v) => f.write_str(&hex_int(*v)),
        Value::Text(s) => f.write_str(s),
        Value::Bytes(b) => f.write_str(&hex::encode(b)),
        Value::Record(r) => write!(f, "{r}"),
    }
}

/// `name(field=0x1, segname=__TEXT, ...)`. Bitfield records list their sub-fields.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema().name())?;

        if self.schema().bitfield_layout().is_some() {
            for (i, (name, value)) in self.derived_values().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={value:#x}")?;
            }
        } else {
            for (i, (name, value)) in self.fields().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}=")?;
                fmt_value(f, value)?;
            }
        }

        f.write_str(")")
    }
}

impl Record {
    /// Multi-line rendering: one field per line, nested records indented
    /// two more spaces than their parent field.
    pub fn render_indented(&self, indent: usize) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_indented(&mut out, indent);
        out
    }

    fn write_indented(&self, out: &mut String, indent: usize) -> fmt::Result {
        writeln!(out, "{}", self.schema().name())?;

        for (name, value) in self.fields() {
            write!(out, "{:indent$}{name}=", "")?;
            match value {
                Value::Record(child) => {
                    write!(out, "\n{:width$}", "", width = indent + 2)?;
                    child.write_indented(out, indent + 2)?;
                }
                other => {
                    fmt_value(out, other)?;
                    out.push('\n');
                }
            }
        }

        Ok(())
    }
}

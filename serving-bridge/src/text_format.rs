//! Protobuf text-format rendering of the Predict messages.
//!
//! Output matches Python's `str(message)`: fields in field-number order,
//! proto3 defaults omitted, map entries sorted by key, enums by name, nested
//! messages indented by two spaces, bytes C-escaped with octal escapes.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::proto::{
    model_spec::VersionChoice, tensor_shape_proto::Dim, DataType, ModelSpec, PredictRequest,
    PredictResponse, TensorProto, TensorShapeProto,
};

/// Render a message as protobuf text format.
pub fn render<M: TextFormat>(message: &M) -> String {
    let mut printer = Printer::default();
    message.write_fields(&mut printer);
    printer.out
}

/// Messages that can be printed in text format.
pub trait TextFormat {
    fn write_fields(&self, p: &mut Printer);
}

// ── Printer ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Printer {
    out: String,
    depth: usize,
}

impl Printer {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        // Writing into a String cannot fail.
        let _ = self.out.write_fmt(args);
        self.out.push('\n');
    }

    fn scalar(&mut self, name: &str, value: impl std::fmt::Display) {
        self.line(format_args!("{name}: {value}"));
    }

    fn bytes(&mut self, name: &str, value: &[u8]) {
        self.line(format_args!("{name}: \"{}\"", escape_bytes(value)));
    }

    fn message(&mut self, name: &str, body: impl FnOnce(&mut Self)) {
        self.line(format_args!("{name} {{"));
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self.line(format_args!("}}"));
    }

    fn string_if_set(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.bytes(name, value.as_bytes());
        }
    }

    fn map(&mut self, name: &str, entries: &BTreeMap<String, TensorProto>) {
        for (key, value) in entries {
            self.message(name, |p| {
                p.bytes("key", key.as_bytes());
                p.message("value", |p| value.write_fields(p));
            });
        }
    }
}

// ── Scalar formatting ─────────────────────────────────────────────────────

/// C-style escaping as done by protobuf's `CEscape`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b'"' => out.push_str("\\\""),
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

/// Shortest round-trip float representation, spelled the way Python does.
fn format_float(debug_repr: String) -> String {
    match debug_repr.as_str() {
        "NaN" => return "nan".to_string(),
        "inf" | "-inf" => return debug_repr,
        _ => {}
    }
    match debug_repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => debug_repr,
    }
}

fn f32_text(v: f32) -> String {
    format_float(format!("{v:?}"))
}

fn f64_text(v: f64) -> String {
    format_float(format!("{v:?}"))
}

fn dtype_text(value: i32) -> String {
    match DataType::try_from(value) {
        Ok(dt) => dt.as_str_name().to_string(),
        Err(_) => value.to_string(),
    }
}

// ── Message impls ─────────────────────────────────────────────────────────

impl TextFormat for Dim {
    fn write_fields(&self, p: &mut Printer) {
        if self.size != 0 {
            p.scalar("size", self.size);
        }
        p.string_if_set("name", &self.name);
    }
}

impl TextFormat for TensorShapeProto {
    fn write_fields(&self, p: &mut Printer) {
        for dim in &self.dim {
            p.message("dim", |p| dim.write_fields(p));
        }
        if self.unknown_rank {
            p.scalar("unknown_rank", true);
        }
    }
}

impl TextFormat for TensorProto {
    fn write_fields(&self, p: &mut Printer) {
        if self.dtype != 0 {
            p.scalar("dtype", dtype_text(self.dtype));
        }
        if let Some(shape) = &self.tensor_shape {
            p.message("tensor_shape", |p| shape.write_fields(p));
        }
        if self.version_number != 0 {
            p.scalar("version_number", self.version_number);
        }
        if !self.tensor_content.is_empty() {
            p.bytes("tensor_content", &self.tensor_content);
        }
        for v in &self.float_val {
            p.scalar("float_val", f32_text(*v));
        }
        for v in &self.double_val {
            p.scalar("double_val", f64_text(*v));
        }
        for v in &self.int_val {
            p.scalar("int_val", v);
        }
        for v in &self.string_val {
            p.bytes("string_val", v);
        }
        for v in &self.scomplex_val {
            p.scalar("scomplex_val", f32_text(*v));
        }
        for v in &self.int64_val {
            p.scalar("int64_val", v);
        }
        for v in &self.bool_val {
            p.scalar("bool_val", v);
        }
        for v in &self.dcomplex_val {
            p.scalar("dcomplex_val", f64_text(*v));
        }
        for v in &self.half_val {
            p.scalar("half_val", v);
        }
        for v in &self.uint32_val {
            p.scalar("uint32_val", v);
        }
        for v in &self.uint64_val {
            p.scalar("uint64_val", v);
        }
    }
}

impl TextFormat for ModelSpec {
    fn write_fields(&self, p: &mut Printer) {
        p.string_if_set("name", &self.name);
        if let Some(VersionChoice::Version(version)) = &self.version_choice {
            p.message("version", |p| {
                if *version != 0 {
                    p.scalar("value", version);
                }
            });
        }
        p.string_if_set("signature_name", &self.signature_name);
        if let Some(VersionChoice::VersionLabel(label)) = &self.version_choice {
            p.bytes("version_label", label.as_bytes());
        }
    }
}

impl TextFormat for PredictRequest {
    fn write_fields(&self, p: &mut Printer) {
        if let Some(spec) = &self.model_spec {
            p.message("model_spec", |p| spec.write_fields(p));
        }
        p.map("inputs", &self.inputs);
        for filter in &self.output_filter {
            p.bytes("output_filter", filter.as_bytes());
        }
    }
}

impl TextFormat for PredictResponse {
    fn write_fields(&self, p: &mut Printer) {
        p.map("outputs", &self.outputs);
        if let Some(spec) = &self.model_spec {
            p.message("model_spec", |p| spec.write_fields(p));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores_response() -> PredictResponse {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "scores".to_string(),
            TensorProto {
                dtype: DataType::DtFloat as i32,
                tensor_shape: Some(TensorShapeProto::from_dims(&[1, 2])),
                float_val: vec![0.25, 0.75],
                ..Default::default()
            },
        );
        PredictResponse {
            outputs,
            model_spec: Some(ModelSpec {
                name: "default".into(),
                version_choice: Some(VersionChoice::Version(1)),
                signature_name: "serving_default".into(),
            }),
        }
    }

    #[test]
    fn renders_response_like_python_str() {
        let expected = "\
outputs {
  key: \"scores\"
  value {
    dtype: DT_FLOAT
    tensor_shape {
      dim {
        size: 1
      }
      dim {
        size: 2
      }
    }
    float_val: 0.25
    float_val: 0.75
  }
}
model_spec {
  name: \"default\"
  version {
    value: 1
  }
  signature_name: \"serving_default\"
}
";
        assert_eq!(render(&scores_response()), expected);
    }

    #[test]
    fn empty_response_renders_empty() {
        assert_eq!(render(&PredictResponse::default()), "");
    }

    #[test]
    fn map_entries_sorted_by_key() {
        let mut response = PredictResponse::default();
        for key in ["b", "a", "c"] {
            response.outputs.insert(key.into(), TensorProto::default());
        }
        let text = render(&response);
        let keys: Vec<&str> = text
            .lines()
            .filter_map(|l| l.trim().strip_prefix("key: "))
            .collect();
        assert_eq!(keys, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[test]
    fn zero_sized_dim_renders_empty_block() {
        let text = render(&TensorShapeProto::from_dims(&[1, 0]));
        assert_eq!(text, "dim {\n  size: 1\n}\ndim {\n}\n");
    }

    #[test]
    fn bytes_are_c_escaped() {
        assert_eq!(escape_bytes(b"a\"b\\c\n"), "a\\\"b\\\\c\\n");
        assert_eq!(escape_bytes(&[0, 0, 128, 63]), "\\000\\000\\200?");
        assert_eq!(escape_bytes("é".as_bytes()), "\\303\\251");
    }

    #[test]
    fn floats_follow_python_spelling() {
        assert_eq!(f32_text(1.0), "1.0");
        assert_eq!(f32_text(0.1), "0.1");
        assert_eq!(f32_text(f32::NAN), "nan");
        assert_eq!(f32_text(f32::NEG_INFINITY), "-inf");
        assert_eq!(format_float("1e20".to_string()), "1e+20");
        assert_eq!(format_float("1e-7".to_string()), "1e-07");
    }

    #[test]
    fn unknown_dtype_printed_as_number() {
        let tensor = TensorProto {
            dtype: 101,
            ..Default::default()
        };
        assert_eq!(render(&tensor), "dtype: 101\n");
    }

    #[test]
    fn request_rendering_includes_inputs() {
        let mut request = PredictRequest {
            model_spec: Some(ModelSpec {
                name: "default".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        request.inputs.insert(
            "x".into(),
            TensorProto {
                dtype: DataType::DtInt8 as i32,
                tensor_content: vec![1, 2],
                ..Default::default()
            },
        );
        let text = render(&request);
        assert!(text.starts_with("model_spec {\n  name: \"default\"\n}\ninputs {\n  key: \"x\"\n"));
        assert!(text.contains("    tensor_content: \"\\001\\002\"\n"));
    }
}

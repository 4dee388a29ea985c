use serde::Serialize;
use std::io::{BufWriter, Write};

use crate::domain::errors::ModuleError;

/// Incremental JSON generator.
///
/// Only the nesting state is kept in memory; scalars are encoded with
/// `serde_json` as they are written, so output of any size streams through.
pub struct JsonStreamWriter<W: Write> {
    out: BufWriter<W>,
    /// One entry per open container: true until its first member is written
    first: Vec<bool>,
    /// A field name was written and its value is pending
    after_name: bool,
}

impl<W: Write> JsonStreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: BufWriter::new(inner),
            first: Vec::new(),
            after_name: false,
        }
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), ModuleError> {
        self.out
            .write_all(bytes)
            .map_err(|e| ModuleError::with_cause("Unable to write to the output file", e))
    }

    /// Comma handling before a value or a field name
    fn separate(&mut self) -> Result<(), ModuleError> {
        if self.after_name {
            self.after_name = false;
            return Ok(());
        }
        if let Some(first) = self.first.last_mut() {
            if *first {
                *first = false;
            } else {
                self.raw(b",")?;
            }
        }
        Ok(())
    }

    pub fn begin_object(&mut self) -> Result<(), ModuleError> {
        self.separate()?;
        self.first.push(true);
        self.raw(b"{")
    }

    pub fn end_object(&mut self) -> Result<(), ModuleError> {
        self.close(b"}")
    }

    pub fn begin_array(&mut self) -> Result<(), ModuleError> {
        self.separate()?;
        self.first.push(true);
        self.raw(b"[")
    }

    pub fn end_array(&mut self) -> Result<(), ModuleError> {
        self.close(b"]")
    }

    fn close(&mut self, token: &[u8]) -> Result<(), ModuleError> {
        if self.first.pop().is_none() {
            return Err(ModuleError::message("Unbalanced JSON output"));
        }
        self.raw(token)
    }

    pub fn name(&mut self, name: &str) -> Result<(), ModuleError> {
        self.separate()?;
        self.scalar(name)?;
        self.raw(b":")?;
        self.after_name = true;
        Ok(())
    }

    pub fn value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ModuleError> {
        self.separate()?;
        self.scalar(value)
    }

    /// `"name":value`
    pub fn field<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ModuleError> {
        self.name(name)?;
        self.value(value)
    }

    fn scalar<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ModuleError> {
        serde_json::to_writer(&mut self.out, value)
            .map_err(|e| ModuleError::with_cause("Unable to write to the output file", e))
    }

    /// Flush and return the underlying writer; every container must be closed
    pub fn finish(self) -> Result<W, ModuleError> {
        if !self.first.is_empty() {
            return Err(ModuleError::message(format!(
                "JSON output closed with {} open container(s)",
                self.first.len()
            )));
        }
        self.out
            .into_inner()
            .map_err(|e| ModuleError::with_cause("Could not flush the JSON output", e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_output_is_valid_json() {
        let mut json = JsonStreamWriter::new(Vec::new());
        json.begin_object().unwrap();
        json.field("algorithm", "SHA-256").unwrap();
        json.name("items").unwrap();
        json.begin_array().unwrap();
        for i in 0..3u64 {
            json.begin_object().unwrap();
            json.field("index", &i).unwrap();
            json.field("name", "a \"quoted\" name").unwrap();
            json.end_object().unwrap();
        }
        json.end_array().unwrap();
        json.field("columns", &vec!["a", "b"]).unwrap();
        json.end_object().unwrap();

        let text = String::from_utf8(json.finish().unwrap()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["items"][2]["index"], 2);
        assert_eq!(parsed["items"][0]["name"], "a \"quoted\" name");
        assert_eq!(parsed["columns"][1], "b");
    }

    #[test]
    fn test_unbalanced_output_is_rejected() {
        let mut json = JsonStreamWriter::new(Vec::new());
        assert!(json.end_object().is_err());
        json.begin_array().unwrap();
        assert!(json.finish().is_err());
    }
}

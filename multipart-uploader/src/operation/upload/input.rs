/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::{self, Error};
use crate::io::InputStream;

/// Input type for uploading a single file
#[non_exhaustive]
#[derive(Debug)]
pub struct UploadInput {
    /// Name the object is registered under with the backend
    pub(crate) name: String,

    /// Object data
    pub(crate) body: InputStream,
}

impl UploadInput {
    /// Creates a new builder-style object to manufacture [`UploadInput`]
    pub fn builder() -> UploadInputBuilder {
        UploadInputBuilder::default()
    }

    /// Name the object is registered under with the backend
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object data
    pub fn body(&self) -> &InputStream {
        &self.body
    }
}

/// A builder for [`UploadInput`]
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct UploadInputBuilder {
    pub(crate) name: Option<String>,
    pub(crate) body: Option<InputStream>,
}

impl UploadInputBuilder {
    /// Name the object is registered under with the backend, typically the local file name.
    ///
    /// This field is required.
    pub fn name(mut self, input: impl Into<String>) -> Self {
        self.name = Some(input.into());
        self
    }

    /// Name the object is registered under with the backend
    pub fn set_name(mut self, input: Option<String>) -> Self {
        self.name = input;
        self
    }

    /// Name the object is registered under with the backend
    pub fn get_name(&self) -> &Option<String> {
        &self.name
    }

    /// Object data.
    ///
    /// This field is required.
    pub fn body(mut self, input: InputStream) -> Self {
        self.body = Some(input);
        self
    }

    /// Object data
    pub fn set_body(mut self, input: Option<InputStream>) -> Self {
        self.body = input;
        self
    }

    /// Object data
    pub fn get_body(&self) -> &Option<InputStream> {
        &self.body
    }

    /// Consumes the builder and constructs an [`UploadInput`]
    pub fn build(self) -> Result<UploadInput, Error> {
        let name = self
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| error::invalid_input("name is required and must not be empty"))?;
        let body = self
            .body
            .ok_or_else(|| error::invalid_input("body is required"))?;
        Ok(UploadInput { name, body })
    }
}

#[cfg(test)]
mod test {
    use super::UploadInput;
    use crate::error::ErrorKind;
    use crate::io::InputStream;

    #[test]
    fn test_build_requires_name_and_body() {
        let err = UploadInput::builder()
            .body(InputStream::from_static(b"x"))
            .build()
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        let err = UploadInput::builder().name("  ").build().unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        let err = UploadInput::builder().name("a.bin").build().unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        let input = UploadInput::builder()
            .name("a.bin")
            .body(InputStream::from_static(b"abc"))
            .build()
            .unwrap();
        assert_eq!("a.bin", input.name());
        assert_eq!(3, input.body().content_length());
    }
}

//! Utilities to split field and method descriptors

use super::error::{ClassFileError, ClassFileResult};

fn invalid(descriptor: &str) -> ClassFileError {
    ClassFileError::InvalidDescriptor { descriptor: descriptor.to_string() }
}

/// End offset (exclusive) of the field type starting at `start`
pub fn field_type_end(descriptor: &str, start: usize) -> ClassFileResult<usize> {
    let bytes = descriptor.as_bytes();
    let mut i = start;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => Ok(i + 1),
        Some(b'L') => descriptor[i..]
            .find(';')
            .map(|end| i + end + 1)
            .filter(|&end| end > i + 2)
            .ok_or_else(|| invalid(descriptor)),
        _ => Err(invalid(descriptor)),
    }
}

/// Check that `descriptor` is exactly one field type
pub fn validate_field_descriptor(descriptor: &str) -> ClassFileResult<()> {
    if field_type_end(descriptor, 0)? == descriptor.len() {
        Ok(())
    } else {
        Err(invalid(descriptor))
    }
}

/// Split a method descriptor into its parameter types and return type
pub fn parse_method_descriptor(descriptor: &str) -> ClassFileResult<(Vec<&str>, &str)> {
    if !descriptor.starts_with('(') {
        return Err(invalid(descriptor));
    }
    let mut params = Vec::new();
    let mut i = 1;
    loop {
        match descriptor.as_bytes().get(i) {
            Some(b')') => break,
            Some(_) => {
                let end = field_type_end(descriptor, i)?;
                params.push(&descriptor[i..end]);
                i = end;
            }
            None => return Err(invalid(descriptor)),
        }
    }
    let ret = &descriptor[i + 1..];
    if ret != "V" {
        validate_field_descriptor(ret).map_err(|_| invalid(descriptor))?;
    }
    Ok((params, ret))
}

/// Build `(params)ret`
pub fn method_descriptor<S: AsRef<str>>(params: &[S], ret: &str) -> String {
    let mut d = String::from("(");
    for p in params {
        d.push_str(p.as_ref());
    }
    d.push(')');
    d.push_str(ret);
    d
}

/// Whether a field type occupies two local/stack slots
pub fn is_wide(field_type: &str) -> bool {
    matches!(field_type, "J" | "D")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_descriptor() {
        let (params, ret) = parse_method_descriptor("(I[Ljava/lang/String;J[[D)La/B;").unwrap();
        assert_eq!(params, vec!["I", "[Ljava/lang/String;", "J", "[[D"]);
        assert_eq!(ret, "La/B;");
    }

    #[test]
    fn test_void_and_empty() {
        let (params, ret) = parse_method_descriptor("()V").unwrap();
        assert!(params.is_empty());
        assert_eq!(ret, "V");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_method_descriptor("(La/B").is_err());
        assert!(parse_method_descriptor("I)V").is_err());
        assert!(parse_method_descriptor("(L;)V").is_err());
        assert!(validate_field_descriptor("V").is_err());
        assert!(validate_field_descriptor("II").is_err());
    }

    #[test]
    fn test_build_descriptor() {
        assert_eq!(method_descriptor(&["I", "La/B;"], "V"), "(ILa/B;)V");
    }
}

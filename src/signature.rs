//! Splitting a `"ClassName.methodName"` observation signature into its class
//! and method views, derived on demand rather than stored (Design Notes:
//! node-key compression keeps the stored key to `(signature, bucket)`).

/// Splits `signature` at its last `.` into `(class, method)`.
///
/// A signature with no `.` is malformed per §7 of the specification: the
/// whole string is treated as the class name and the method name is empty.
pub fn split_signature(signature: &str) -> (&str, &str) {
    match signature.rfind('.') {
        Some(idx) => (&signature[..idx], &signature[idx + 1..]),
        None => (signature, ""),
    }
}

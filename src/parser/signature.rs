//! Method signatures shared by every log format.
//!
//! Each vendor prints method identity differently:
//!
//! - HotSpot: `java/lang/String hashCode ()I`
//! - J9: `java/lang/String.hashCode()I`
//! - Zing: `java.lang.String::hashCode()I`
//!
//! All of them are reduced to a [`MemberSignature`], whose canonical text is
//! `java.lang.String hashCode ()I`.

use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural identity of a method
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberSignature {
    /// Fully-qualified, dot-separated class name
    pub class_name: String,

    pub member_name: String,

    /// Raw descriptor, e.g. `(JI)Ljava/lang/String;`
    pub descriptor: String,

    /// Readable return type, e.g. `java.lang.String`
    pub return_type: String,

    /// Readable parameter types in declaration order
    pub param_types: Vec<String>,
}

impl MemberSignature {
    /// Build from class, member name and raw descriptor
    pub fn new(class_name: &str, member_name: &str, descriptor: &str) -> Result<Self, ParseError> {
        let (params, ret) = split_descriptor(descriptor)?;
        let param_types = params
            .iter()
            .map(|p| descriptor_to_readable(p))
            .collect::<Result<Vec<_>, _>>()?;
        let return_type = descriptor_to_readable(ret)?;

        Ok(Self {
            class_name: slash_to_dot(class_name),
            member_name: member_name.to_string(),
            descriptor: descriptor.to_string(),
            return_type,
            param_types,
        })
    }

    /// Parse HotSpot's `method='pkg/Class name (desc)ret'` attribute
    pub fn from_hotspot(text: &str) -> Result<Self, ParseError> {
        let mut parts = text.split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(class), Some(member), Some(descriptor), None) => {
                Self::new(class, member, descriptor)
            }
            _ => Err(ParseError::InvalidSignature(text.to_string())),
        }
    }

    /// Parse `pkg/Class.member(desc)ret` (J9) or `pkg.Class::member(desc)ret` (Zing)
    ///
    /// The class separator is `::` when present, else the last `.` before the
    /// descriptor.
    pub fn from_qualified(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        let paren = text
            .find('(')
            .ok_or_else(|| ParseError::InvalidSignature(text.to_string()))?;
        let (qualified, descriptor) = text.split_at(paren);

        let (class, member) = match qualified.rfind("::") {
            Some(sep) => (&qualified[..sep], &qualified[sep + 2..]),
            None => {
                let sep = qualified
                    .rfind('.')
                    .ok_or_else(|| ParseError::InvalidSignature(text.to_string()))?;
                (&qualified[..sep], &qualified[sep + 1..])
            }
        };
        if class.is_empty() || member.is_empty() {
            return Err(ParseError::InvalidSignature(text.to_string()));
        }
        Self::new(class, member, descriptor)
    }

    /// Parse canonical text `pkg.Class member (desc)ret`
    pub fn from_canonical(text: &str) -> Result<Self, ParseError> {
        Self::from_hotspot(text)
    }

    /// Canonical cross-format text: `pkg.Class member (desc)ret`
    pub fn canonical(&self) -> String {
        format!("{} {} {}", self.class_name, self.member_name, self.descriptor)
    }

    pub fn package_name(&self) -> &str {
        match self.class_name.rfind('.') {
            Some(idx) => &self.class_name[..idx],
            None => "",
        }
    }

    pub fn simple_class_name(&self) -> &str {
        match self.class_name.rfind('.') {
            Some(idx) => &self.class_name[idx + 1..],
            None => &self.class_name,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.member_name == "<init>"
    }

    pub fn is_static_initializer(&self) -> bool {
        self.member_name == "<clinit>"
    }

    /// Java-like rendering: `java.lang.String hashCode(int, long)` style
    pub fn readable(&self) -> String {
        format!(
            "{} {}.{}({})",
            self.return_type,
            self.class_name,
            self.member_name,
            self.param_types.join(", ")
        )
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Convert `java/lang/String` (or `java.lang.String`) to dotted form
pub fn slash_to_dot(name: &str) -> String {
    name.replace('/', ".")
}

/// Split `(IJ[Ljava/lang/String;)V` into parameter descriptors and return descriptor
pub fn split_descriptor(descriptor: &str) -> Result<(Vec<&str>, &str), ParseError> {
    let invalid = || ParseError::InvalidDescriptor(descriptor.to_string());

    let inner = descriptor.strip_prefix('(').ok_or_else(invalid)?;
    let close = inner.find(')').ok_or_else(invalid)?;
    let (mut params_text, ret) = (&inner[..close], &inner[close + 1..]);
    if ret.is_empty() {
        return Err(invalid());
    }

    let mut params = Vec::new();
    while !params_text.is_empty() {
        let len = field_descriptor_len(params_text).ok_or_else(invalid)?;
        params.push(&params_text[..len]);
        params_text = &params_text[len..];
    }

    if field_descriptor_len(ret) != Some(ret.len()) {
        return Err(invalid());
    }
    Ok((params, ret))
}

/// Length of the first field descriptor at the start of `text`
fn field_descriptor_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b'V' => Some(i + 1),
        b'L' => text[i..].find(';').map(|semi| i + semi + 1),
        _ => None,
    }
}

/// Map a single field descriptor to its readable Java type
///
/// **Public** - shared by all format parsers and the bytecode model
///
/// `J` → `long`, `[I` → `int[]`, `Ljava/lang/String;` → `java.lang.String`
pub fn descriptor_to_readable(descriptor: &str) -> Result<String, ParseError> {
    let dimensions = descriptor.chars().take_while(|c| *c == '[').count();
    let element = &descriptor[dimensions..];

    let base = match element {
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "D" => "double".to_string(),
        "F" => "float".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "S" => "short".to_string(),
        "Z" => "boolean".to_string(),
        "V" if dimensions == 0 => "void".to_string(),
        _ => element
            .strip_prefix('L')
            .and_then(|e| e.strip_suffix(';'))
            .filter(|e| !e.is_empty())
            .map(slash_to_dot)
            .ok_or_else(|| ParseError::InvalidDescriptor(descriptor.to_string()))?,
    };

    Ok(format!("{}{}", base, "[]".repeat(dimensions)))
}

/// Java access modifiers decoded from class-file access flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
    Synchronized,
    Native,
    Abstract,
    Strictfp,
}

impl Modifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Synchronized => "synchronized",
            Modifier::Native => "native",
            Modifier::Abstract => "abstract",
            Modifier::Strictfp => "strictfp",
        }
    }

    /// Parse a javap keyword or `ACC_` flag name
    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.trim().trim_end_matches(',');
        let word = word.strip_prefix("ACC_").unwrap_or(word);
        match word.to_lowercase().as_str() {
            "public" => Some(Modifier::Public),
            "private" => Some(Modifier::Private),
            "protected" => Some(Modifier::Protected),
            "static" => Some(Modifier::Static),
            "final" => Some(Modifier::Final),
            "synchronized" => Some(Modifier::Synchronized),
            "native" => Some(Modifier::Native),
            "abstract" => Some(Modifier::Abstract),
            "strictfp" | "strict" => Some(Modifier::Strictfp),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// Method access flag marking a varargs method
pub const ACC_VARARGS: u32 = 0x0080;

/// Decode method access flags into modifiers plus the varargs bit
pub fn decode_access_flags(flags: u32) -> (Vec<Modifier>, bool) {
    const TABLE: &[(u32, Modifier)] = &[
        (0x0001, Modifier::Public),
        (0x0002, Modifier::Private),
        (0x0004, Modifier::Protected),
        (0x0008, Modifier::Static),
        (0x0010, Modifier::Final),
        (0x0020, Modifier::Synchronized),
        (0x0100, Modifier::Native),
        (0x0400, Modifier::Abstract),
        (0x0800, Modifier::Strictfp),
    ];
    let modifiers = TABLE
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, m)| *m)
        .collect();
    (modifiers, flags & ACC_VARARGS != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_to_readable() {
        assert_eq!(descriptor_to_readable("J").unwrap(), "long");
        assert_eq!(descriptor_to_readable("V").unwrap(), "void");
        assert_eq!(descriptor_to_readable("[[I").unwrap(), "int[][]");
        assert_eq!(
            descriptor_to_readable("[Ljava/lang/String;").unwrap(),
            "java.lang.String[]"
        );
        assert!(descriptor_to_readable("Q").is_err());
        assert!(descriptor_to_readable("[V").is_err());
        assert!(descriptor_to_readable("L;").is_err());
    }

    #[test]
    fn test_split_descriptor() {
        let (params, ret) = split_descriptor("(IJ[Ljava/lang/Object;Z)Ljava/lang/String;").unwrap();
        assert_eq!(params, vec!["I", "J", "[Ljava/lang/Object;", "Z"]);
        assert_eq!(ret, "Ljava/lang/String;");
        assert!(split_descriptor("()").is_err());
        assert!(split_descriptor("(X)V").is_err());
        assert!(split_descriptor("IV").is_err());
    }

    #[test]
    fn test_from_hotspot() {
        let sig = MemberSignature::from_hotspot("java/lang/String charAt (I)C").unwrap();
        assert_eq!(sig.class_name, "java.lang.String");
        assert_eq!(sig.member_name, "charAt");
        assert_eq!(sig.return_type, "char");
        assert_eq!(sig.param_types, vec!["int"]);
        assert_eq!(sig.canonical(), "java.lang.String charAt (I)C");
        assert_eq!(sig.package_name(), "java.lang");
        assert_eq!(sig.simple_class_name(), "String");
    }

    #[test]
    fn test_from_qualified_j9_and_zing() {
        let j9 = MemberSignature::from_qualified("java/lang/Double.longBitsToDouble(J)D").unwrap();
        let zing = MemberSignature::from_qualified("java.lang.Double::longBitsToDouble(J)D").unwrap();
        assert_eq!(j9, zing);
        assert_eq!(j9.canonical(), "java.lang.Double longBitsToDouble (J)D");
    }

    #[test]
    fn test_constructor_signature() {
        let sig = MemberSignature::from_qualified("java/util/ArrayList.<init>(I)V").unwrap();
        assert!(sig.is_constructor());
        assert_eq!(sig.readable(), "void java.util.ArrayList.<init>(int)");
    }

    #[test]
    fn test_default_package() {
        let sig = MemberSignature::from_hotspot("Main main ([Ljava/lang/String;)V").unwrap();
        assert_eq!(sig.package_name(), "");
        assert_eq!(sig.simple_class_name(), "Main");
    }

    #[test]
    fn test_decode_access_flags() {
        let (modifiers, varargs) = decode_access_flags(0x0089);
        assert_eq!(modifiers, vec![Modifier::Public, Modifier::Static]);
        assert!(varargs);
        assert_eq!(Modifier::from_keyword("ACC_FINAL"), Some(Modifier::Final));
    }
}

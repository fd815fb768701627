#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Schema requiring `<person><name/><age/></person>` with an integer age
pub const PERSON_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="person">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="name" type="xs:string"/>
                <xs:element name="age" type="xs:int"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

pub const VALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<person>
    <name>Ada</name>
    <age>36</age>
</person>"#;

pub const INVALID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<person>
    <name>Ada</name>
    <age>thirty-six</age>
</person>"#;

pub const MALFORMED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<person>
    <name>Ada</name>"#;

/// Write `content` to `root/relative`, creating parent directories
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Run the built binary
pub fn run_cli<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_xsd-validate"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run xsd-validate")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

//! libxml2 schema engine
//!
//! Direct FFI bindings to the parts of libxml2 needed for XSD validation,
//! wrapped as a [`SchemaHandle`] / [`ValidationSession`] pair.
//!
//! ## Thread Safety
//!
//! - **Initialization**: `xmlInitParser` is not thread-safe and runs exactly once.
//! - **Schema parsing**: NOT thread-safe in libxml2; serialized behind a
//!   process-wide lock. A run parses one schema, up front.
//! - **Validation**: thread-safe as long as every thread uses its own
//!   validation context. Each [`LibXml2Session`] owns one context, and the
//!   compiled `xmlSchema` is only read after parsing, so it is shared through
//!   an `Arc` without further locking.

use std::ffi::{CStr, CString};
use std::marker::PhantomData;
use std::path::Path;
use std::ptr;
use std::sync::{Arc, Mutex, Once};

use libc::{c_char, c_int, c_uint, c_void};
use tracing::debug;

use crate::engine::{Diagnostic, SchemaHandle, Severity, ValidationSession};
use crate::error::{EngineError, EngineResult};

static LIBXML2_INIT: Once = Once::new();

/// Serializes `xmlSchemaParse`
static SCHEMA_PARSE_LOCK: Mutex<()> = Mutex::new(());

// xmlParserOption flags
const XML_PARSE_NOERROR: c_int = 1 << 5;
const XML_PARSE_NOWARNING: c_int = 1 << 6;
const XML_PARSE_NONET: c_int = 1 << 11;
const XML_PARSE_BIG_LINES: c_int = 1 << 22;

const DOCUMENT_PARSE_OPTIONS: c_int =
    XML_PARSE_NOERROR | XML_PARSE_NOWARNING | XML_PARSE_NONET | XML_PARSE_BIG_LINES;

// xmlErrorLevel
const XML_ERR_WARNING: c_int = 1;
const XML_ERR_ERROR: c_int = 2;
const XML_ERR_FATAL: c_int = 3;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    /// Column number, when the reporter knows it
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *const xmlError)>;

#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();

    // Schema parsing
    pub fn xmlSchemaNewParserCtxt(url: *const c_char) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *mut XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation
    pub fn xmlSchemaNewValidCtxt(schema: *mut XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateFile(
        ctxt: *mut XmlSchemaValidCtxt,
        file_name: *const c_char,
        options: c_uint,
    ) -> c_int;

    // Document parsing
    pub fn xmlNewParserCtxt() -> *mut XmlParserCtxt;
    pub fn xmlFreeParserCtxt(ctxt: *mut XmlParserCtxt);
    pub fn xmlCtxtReadMemory(
        ctxt: *mut XmlParserCtxt,
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlCtxtGetLastError(ctx: *mut c_void) -> *const xmlError;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
}

fn init() {
    LIBXML2_INIT.call_once(|| unsafe {
        xmlInitParser();
    });
}

/// Read the trimmed message of a libxml2 error, if any
///
/// # Safety
///
/// `error` must be null or point to a live `xmlError`.
unsafe fn error_message(error: *const xmlError) -> Option<String> {
    if error.is_null() {
        return None;
    }
    let msg_ptr = unsafe { (*error).message };
    if msg_ptr.is_null() {
        return None;
    }
    let message = unsafe { CStr::from_ptr(msg_ptr) }
        .to_string_lossy()
        .trim()
        .to_string();
    Some(message)
}

/// 1-based position; libxml2 reports 0 (or less) when it does not know
fn to_position(value: c_int) -> u32 {
    u32::try_from(value).ok().filter(|&v| v > 0).unwrap_or(1)
}

/// Collects validity errors into a `Vec<Diagnostic>`
unsafe extern "C" fn diagnostic_callback(user_data: *mut c_void, error: *const xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let diagnostics = unsafe { &mut *(user_data as *mut Vec<Diagnostic>) };

    let severity = match unsafe { (*error).level } {
        XML_ERR_WARNING => Severity::Warning,
        XML_ERR_ERROR => Severity::Error,
        XML_ERR_FATAL => Severity::Fatal,
        _ => return,
    };
    let Some(message) = (unsafe { error_message(error) }) else {
        return;
    };
    let (line, column) = unsafe { ((*error).line, (*error).int2) };

    diagnostics.push(Diagnostic::new(
        severity,
        message,
        to_position(line),
        to_position(column),
    ));
}

/// Collects schema parser errors as plain messages
unsafe extern "C" fn schema_error_callback(user_data: *mut c_void, error: *const xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let messages = unsafe { &mut *(user_data as *mut Vec<String>) };

    if unsafe { (*error).level } < XML_ERR_ERROR {
        return;
    }
    if let Some(message) = unsafe { error_message(error) } {
        messages.push(message);
    }
}

/// Reference-counted owner of a compiled `xmlSchema`
#[derive(Debug, Clone)]
pub struct XmlSchemaPtr {
    inner: Arc<XmlSchemaInner>,
}

#[derive(Debug)]
struct XmlSchemaInner {
    ptr: *mut XmlSchema,
    _phantom: PhantomData<XmlSchema>,
}

// Safety: a parsed xmlSchema is only read during validation, and libxml2
// documents schema structures as safe to share for reading across threads.
unsafe impl Send for XmlSchemaInner {}
unsafe impl Sync for XmlSchemaInner {}

impl XmlSchemaPtr {
    /// # Safety
    ///
    /// `ptr` must come from `xmlSchemaParse` and must not be freed elsewhere.
    unsafe fn from_raw(ptr: *mut XmlSchema) -> EngineResult<Self> {
        if ptr.is_null() {
            return Err(EngineError::SchemaParseFailed {
                details: "libxml2 returned no schema".to_string(),
            });
        }
        Ok(XmlSchemaPtr {
            inner: Arc::new(XmlSchemaInner {
                ptr,
                _phantom: PhantomData,
            }),
        })
    }

    fn as_ptr(&self) -> *mut XmlSchema {
        self.inner.ptr
    }
}

impl Drop for XmlSchemaInner {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// A schema compiled by libxml2
#[derive(Debug, Clone)]
pub struct LibXml2Schema {
    schema: XmlSchemaPtr,
}

impl LibXml2Schema {
    /// Parse the XSD at `path`.
    ///
    /// Parsing from the path (rather than from bytes) lets relative
    /// `xs:include` and `xs:import` locations resolve against the schema file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        init();

        let path_str = path.to_str().ok_or_else(|| EngineError::InvalidPath {
            path: path.to_path_buf(),
        })?;
        let c_path = CString::new(path_str).map_err(|_| EngineError::InvalidPath {
            path: path.to_path_buf(),
        })?;

        let mut messages: Vec<String> = Vec::new();

        let schema_ptr = {
            // A poisoned lock only means another parse panicked; the guard
            // itself protects no data.
            let _guard = SCHEMA_PARSE_LOCK
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            unsafe {
                let parser_ctxt = xmlSchemaNewParserCtxt(c_path.as_ptr());
                if parser_ctxt.is_null() {
                    return Err(EngineError::MemoryAllocation);
                }

                xmlSchemaSetParserStructuredErrors(
                    parser_ctxt,
                    Some(schema_error_callback),
                    &mut messages as *mut Vec<String> as *mut c_void,
                );

                let schema_ptr = xmlSchemaParse(parser_ctxt);
                xmlSchemaFreeParserCtxt(parser_ctxt);
                schema_ptr
            }
        };

        if schema_ptr.is_null() {
            let details = if messages.is_empty() {
                "schema could not be parsed".to_string()
            } else {
                messages.join("; ")
            };
            return Err(EngineError::SchemaParseFailed { details });
        }

        debug!(schema = %path.display(), "schema parsed");
        let schema = unsafe { XmlSchemaPtr::from_raw(schema_ptr)? };
        Ok(Self { schema })
    }
}

impl SchemaHandle for LibXml2Schema {
    fn new_session(&self) -> EngineResult<Box<dyn ValidationSession>> {
        let session = LibXml2Session::new(self.schema.clone())?;
        Ok(Box::new(session))
    }
}

/// One validation context bound to a shared schema
pub struct LibXml2Session {
    valid_ctxt: *mut XmlSchemaValidCtxt,
    // Keeps the schema alive for as long as the context points at it
    _schema: XmlSchemaPtr,
}

impl LibXml2Session {
    fn new(schema: XmlSchemaPtr) -> EngineResult<Self> {
        let valid_ctxt = unsafe { xmlSchemaNewValidCtxt(schema.as_ptr()) };
        if valid_ctxt.is_null() {
            return Err(EngineError::ValidationContextCreationFailed);
        }
        Ok(Self {
            valid_ctxt,
            _schema: schema,
        })
    }

    /// Reject content that is not well-formed, with the parser's message
    fn check_well_formed(file: &Path, content: &[u8]) -> EngineResult<()> {
        let size = c_int::try_from(content.len()).map_err(|_| EngineError::TooLarge {
            size: content.len(),
        })?;
        let url = file.to_str().and_then(|s| CString::new(s).ok());
        let url_ptr = url.as_ref().map_or(ptr::null(), |u| u.as_ptr());

        unsafe {
            let parser_ctxt = xmlNewParserCtxt();
            if parser_ctxt.is_null() {
                return Err(EngineError::MemoryAllocation);
            }

            let doc = xmlCtxtReadMemory(
                parser_ctxt,
                content.as_ptr() as *const c_char,
                size,
                url_ptr,
                ptr::null(),
                DOCUMENT_PARSE_OPTIONS,
            );

            if doc.is_null() {
                let message = error_message(xmlCtxtGetLastError(parser_ctxt as *mut c_void))
                    .unwrap_or_else(|| "document is not well-formed".to_string());
                xmlFreeParserCtxt(parser_ctxt);
                return Err(EngineError::Malformed { message });
            }

            xmlFreeDoc(doc);
            xmlFreeParserCtxt(parser_ctxt);
            Ok(())
        }
    }
}

impl ValidationSession for LibXml2Session {
    /// Validates the file on disk so libxml2 streams it and reports
    /// line and column for each error. `content` is only pre-parsed to
    /// tell malformed documents apart from invalid ones.
    fn validate(&mut self, file: &Path, content: &[u8]) -> EngineResult<Vec<Diagnostic>> {
        Self::check_well_formed(file, content)?;

        let c_path = file
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| EngineError::InvalidPath {
                path: file.to_path_buf(),
            })?;

        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let result_code = unsafe {
            xmlSchemaSetValidStructuredErrors(
                self.valid_ctxt,
                Some(diagnostic_callback),
                &mut diagnostics as *mut Vec<Diagnostic> as *mut c_void,
            );
            let code = xmlSchemaValidateFile(self.valid_ctxt, c_path.as_ptr(), 0);
            // Detach the callback before `diagnostics` can move
            xmlSchemaSetValidStructuredErrors(self.valid_ctxt, None, ptr::null_mut());
            code
        };

        if result_code < 0 {
            return Err(EngineError::Internal { code: result_code });
        }

        let reported_failure = diagnostics
            .iter()
            .any(|d| d.severity != Severity::Warning);
        if result_code > 0 && !reported_failure {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                format!("document failed schema validation (code {})", result_code),
                1,
                1,
            ));
        }

        Ok(diagnostics)
    }
}

impl Drop for LibXml2Session {
    fn drop(&mut self) {
        if !self.valid_ctxt.is_null() {
            unsafe {
                xmlSchemaFreeValidCtxt(self.valid_ctxt);
            }
            self.valid_ctxt = ptr::null_mut();
        }
    }
}

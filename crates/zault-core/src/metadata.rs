//! The plaintext record carried inside a metadata block's encrypted
//! payload: the content key for the paired content block plus the file's
//! name, MIME type and size.

use crate::error::{Result, ZaultError};

pub const CONTENT_KEY_LEN: usize = 32;
const MAX_FILENAME_LEN: usize = 4096;
const MAX_MIME_LEN: usize = 256;

const METADATA_VERSION: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub content_key: [u8; CONTENT_KEY_LEN],
    pub size: u64,
    pub filename: String,
    pub mime: String,
}

impl Metadata {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.filename.len() > MAX_FILENAME_LEN {
            return Err(ZaultError::MetadataMalformed("filename exceeds 4 KiB"));
        }
        if self.mime.len() > MAX_MIME_LEN {
            return Err(ZaultError::MetadataMalformed("mime type exceeds 256 bytes"));
        }

        let mut out = Vec::with_capacity(
            1 + CONTENT_KEY_LEN + 8 + 2 + self.filename.len() + 2 + self.mime.len(),
        );
        out.push(METADATA_VERSION);
        out.extend_from_slice(&self.content_key);
        out.extend_from_slice(&self.size.to_be_bytes());
        out.extend_from_slice(&(self.filename.len() as u16).to_be_bytes());
        out.extend_from_slice(self.filename.as_bytes());
        out.extend_from_slice(&(self.mime.len() as u16).to_be_bytes());
        out.extend_from_slice(self.mime.as_bytes());
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut offset = 0;
        let need = |offset: usize, n: usize, what: &'static str| -> Result<()> {
            if bytes.len() < offset + n {
                Err(ZaultError::MetadataMalformed(what))
            } else {
                Ok(())
            }
        };

        need(offset, 1, "truncated before version")?;
        if bytes[offset] != METADATA_VERSION {
            return Err(ZaultError::MetadataMalformed("unsupported metadata version"));
        }
        offset += 1;

        need(offset, CONTENT_KEY_LEN, "truncated before content_key")?;
        let mut content_key = [0u8; CONTENT_KEY_LEN];
        content_key.copy_from_slice(&bytes[offset..offset + CONTENT_KEY_LEN]);
        offset += CONTENT_KEY_LEN;

        need(offset, 8, "truncated before size")?;
        let size = u64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
        offset += 8;

        need(offset, 2, "truncated before filename_len")?;
        let filename_len = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap()) as usize;
        offset += 2;
        if filename_len > MAX_FILENAME_LEN {
            return Err(ZaultError::MetadataMalformed("filename_len exceeds 4 KiB"));
        }
        need(offset, filename_len, "filename shorter than filename_len")?;
        let filename = String::from_utf8(bytes[offset..offset + filename_len].to_vec())
            .map_err(|_| ZaultError::MetadataMalformed("filename is not valid UTF-8"))?;
        offset += filename_len;

        need(offset, 2, "truncated before mime_len")?;
        let mime_len = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap()) as usize;
        offset += 2;
        if mime_len > MAX_MIME_LEN {
            return Err(ZaultError::MetadataMalformed("mime_len exceeds 256 bytes"));
        }
        need(offset, mime_len, "mime shorter than mime_len")?;
        let mime = String::from_utf8(bytes[offset..offset + mime_len].to_vec())
            .map_err(|_| ZaultError::MetadataMalformed("mime is not valid UTF-8"))?;
        offset += mime_len;

        if offset != bytes.len() {
            return Err(ZaultError::MetadataMalformed("trailing bytes after mime"));
        }

        Ok(Metadata {
            content_key,
            size,
            filename,
            mime,
        })
    }
}

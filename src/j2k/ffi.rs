// Thin RAII layer over the OpenJPEG C API.
// https://www.openjpeg.org/doxygen/openjpeg_8h.html

use super::{J2kError, Jpeg2000Format};
use openjpeg_sys as opj;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use tracing::{debug, error, warn};

const STREAM_CHUNK_SIZE: usize = 1 << 20;

impl Jpeg2000Format {
    fn codec_format(&self) -> opj::CODEC_FORMAT {
        match self {
            Jpeg2000Format::J2k => opj::CODEC_FORMAT::OPJ_CODEC_J2K,
            Jpeg2000Format::Jp2 => opj::CODEC_FORMAT::OPJ_CODEC_JP2,
        }
    }
}

fn message(msg: *const c_char) -> String {
    if msg.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(msg) }
        .to_string_lossy()
        .trim_end()
        .to_string()
}

unsafe extern "C" fn on_error(msg: *const c_char, client_data: *mut c_void) {
    let text = message(msg);
    error!("openjpeg: {text}");
    if let Some(messages) = (client_data as *mut Vec<String>).as_mut() {
        messages.push(text);
    }
}

unsafe extern "C" fn on_warning(msg: *const c_char, _client_data: *mut c_void) {
    warn!("openjpeg: {}", message(msg));
}

unsafe extern "C" fn on_info(msg: *const c_char, _client_data: *mut c_void) {
    debug!("openjpeg: {}", message(msg));
}

/// Owns an `opj_codec_t` together with the error messages it reports.
pub(super) struct Codec {
    pub ptr: *mut opj::opj_codec_t,
    messages: *mut Vec<String>,
}

impl Codec {
    pub fn compressor(format: Jpeg2000Format) -> Result<Self, J2kError> {
        let ptr = unsafe { opj::opj_create_compress(format.codec_format()) };
        Self::wrap(ptr)
    }

    pub fn decompressor(format: Jpeg2000Format) -> Result<Self, J2kError> {
        let ptr = unsafe { opj::opj_create_decompress(format.codec_format()) };
        Self::wrap(ptr)
    }

    fn wrap(ptr: *mut opj::opj_codec_t) -> Result<Self, J2kError> {
        if ptr.is_null() {
            return Err(J2kError::CodecUnavailable);
        }
        let messages = Box::into_raw(Box::new(Vec::new()));
        unsafe {
            opj::opj_set_error_handler(ptr, Some(on_error), messages as *mut c_void);
            opj::opj_set_warning_handler(ptr, Some(on_warning), ptr::null_mut());
            opj::opj_set_info_handler(ptr, Some(on_info), ptr::null_mut());
        }
        Ok(Self { ptr, messages })
    }

    /// Errors reported by OpenJPEG so far.
    pub fn messages(&self) -> Vec<String> {
        unsafe { (*self.messages).clone() }
    }
}

impl Drop for Codec {
    fn drop(&mut self) {
        unsafe {
            opj::opj_destroy_codec(self.ptr);
            drop(Box::from_raw(self.messages));
        }
    }
}

pub(super) struct Image {
    pub ptr: *mut opj::opj_image_t,
}

impl Image {
    pub fn create(
        params: &mut [opj::opj_image_cmptparm_t],
        color_space: opj::COLOR_SPACE,
    ) -> Result<Self, J2kError> {
        let ptr = unsafe {
            opj::opj_image_create(params.len() as opj::OPJ_UINT32, params.as_mut_ptr(), color_space)
        };
        if ptr.is_null() {
            return Err(J2kError::CodecUnavailable);
        }
        Ok(Self { ptr })
    }

    pub fn components(&self) -> &[opj::opj_image_comp_t] {
        unsafe {
            let image = &*self.ptr;
            if image.comps.is_null() {
                return &[];
            }
            std::slice::from_raw_parts(image.comps, image.numcomps as usize)
        }
    }

    /// Sample plane of one component, `w * h` values long.
    pub fn plane(&self, component: usize) -> Option<&[i32]> {
        let comp = self.components().get(component)?;
        if comp.data.is_null() {
            return None;
        }
        let len = comp.w as usize * comp.h as usize;
        Some(unsafe { std::slice::from_raw_parts(comp.data, len) })
    }

    pub fn plane_mut(&mut self, component: usize) -> Option<&mut [i32]> {
        let comp = self.components().get(component)?;
        let (data, len) = (comp.data, comp.w as usize * comp.h as usize);
        if data.is_null() {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(data, len) })
    }

    pub fn set_bounds(&mut self, width: u32, height: u32) {
        unsafe {
            (*self.ptr).x0 = 0;
            (*self.ptr).y0 = 0;
            (*self.ptr).x1 = width;
            (*self.ptr).y1 = height;
        }
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { opj::opj_image_destroy(self.ptr) };
        }
    }
}

/// In-memory byte stream handed to OpenJPEG as user data.
struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
    writable: bool,
}

impl MemoryStream {
    /// Moves to `target`. A writer grows its buffer so skipped bytes survive as zeros.
    fn move_to(&mut self, target: i64) -> bool {
        if target < 0 {
            return false;
        }
        let target = target as usize;
        if self.writable && self.data.len() < target {
            self.data.resize(target, 0);
        }
        self.pos = target;
        true
    }
}

unsafe fn memory<'a>(user_data: *mut c_void) -> &'a mut MemoryStream {
    &mut *(user_data as *mut MemoryStream)
}

unsafe extern "C" fn read_memory(
    buffer: *mut c_void,
    nb_bytes: opj::OPJ_SIZE_T,
    user_data: *mut c_void,
) -> opj::OPJ_SIZE_T {
    let stream = memory(user_data);
    let remaining = stream.data.len().saturating_sub(stream.pos);
    if remaining == 0 {
        return opj::OPJ_SIZE_T::MAX;
    }
    let n = remaining.min(nb_bytes as usize);
    ptr::copy_nonoverlapping(stream.data.as_ptr().add(stream.pos), buffer as *mut u8, n);
    stream.pos += n;
    n as opj::OPJ_SIZE_T
}

unsafe extern "C" fn write_memory(
    buffer: *mut c_void,
    nb_bytes: opj::OPJ_SIZE_T,
    user_data: *mut c_void,
) -> opj::OPJ_SIZE_T {
    let stream = memory(user_data);
    let n = nb_bytes as usize;
    let end = stream.pos + n;
    if stream.data.len() < end {
        stream.data.resize(end, 0);
    }
    ptr::copy_nonoverlapping(buffer as *const u8, stream.data.as_mut_ptr().add(stream.pos), n);
    stream.pos = end;
    nb_bytes
}

unsafe extern "C" fn skip_memory(nb_bytes: opj::OPJ_OFF_T, user_data: *mut c_void) -> opj::OPJ_OFF_T {
    let stream = memory(user_data);
    if stream.move_to(stream.pos as i64 + nb_bytes as i64) {
        nb_bytes
    } else {
        -1
    }
}

unsafe extern "C" fn seek_memory(nb_bytes: opj::OPJ_OFF_T, user_data: *mut c_void) -> opj::OPJ_BOOL {
    let stream = memory(user_data);
    stream.move_to(nb_bytes as i64) as opj::OPJ_BOOL
}

pub(super) struct Stream {
    pub ptr: *mut opj::opj_stream_t,
    user_data: *mut MemoryStream,
}

impl Stream {
    pub fn reader(data: Vec<u8>) -> Result<Self, J2kError> {
        let len = data.len() as u64;
        let stream = Self::create(data, true)?;
        unsafe {
            opj::opj_stream_set_read_function(stream.ptr, Some(read_memory));
            opj::opj_stream_set_user_data_length(stream.ptr, len);
        }
        Ok(stream)
    }

    pub fn writer() -> Result<Self, J2kError> {
        let stream = Self::create(Vec::new(), false)?;
        unsafe { opj::opj_stream_set_write_function(stream.ptr, Some(write_memory)) };
        Ok(stream)
    }

    fn create(data: Vec<u8>, input: bool) -> Result<Self, J2kError> {
        let ptr = unsafe { opj::opj_stream_create(STREAM_CHUNK_SIZE as opj::OPJ_SIZE_T, input as opj::OPJ_BOOL) };
        if ptr.is_null() {
            return Err(J2kError::StreamUnavailable);
        }
        let user_data = Box::into_raw(Box::new(MemoryStream {
            data,
            pos: 0,
            writable: !input,
        }));
        unsafe {
            opj::opj_stream_set_skip_function(ptr, Some(skip_memory));
            opj::opj_stream_set_seek_function(ptr, Some(seek_memory));
            opj::opj_stream_set_user_data(ptr, user_data as *mut c_void, None);
        }
        Ok(Self { ptr, user_data })
    }

    /// Destroys the OpenJPEG stream (flushing nothing further) and returns the bytes written.
    pub fn into_inner(mut self) -> Vec<u8> {
        unsafe {
            opj::opj_stream_destroy(self.ptr);
            self.ptr = ptr::null_mut();
            let memory = Box::from_raw(self.user_data);
            self.user_data = ptr::null_mut();
            memory.data
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        unsafe {
            if !self.ptr.is_null() {
                opj::opj_stream_destroy(self.ptr);
            }
            if !self.user_data.is_null() {
                drop(Box::from_raw(self.user_data));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> MemoryStream {
        MemoryStream {
            data: Vec::new(),
            pos: 0,
            writable: true,
        }
    }

    #[test]
    fn trailing_skip_extends_written_bytes() {
        let mut stream = writer();
        let user_data = &mut stream as *mut MemoryStream as *mut c_void;
        let payload = [1_u8, 2, 3];
        unsafe {
            write_memory(payload.as_ptr() as *mut c_void, 3, user_data);
            assert_eq!(skip_memory(4, user_data), 4);
        }
        assert_eq!(stream.data, vec![1, 2, 3, 0, 0, 0, 0]);
        assert_eq!(stream.pos, 7);
    }

    #[test]
    fn reader_skip_past_end_leaves_data_alone() {
        let mut stream = MemoryStream {
            data: vec![9; 4],
            pos: 0,
            writable: false,
        };
        let user_data = &mut stream as *mut MemoryStream as *mut c_void;
        let mut buf = [0_u8; 2];
        unsafe {
            assert_eq!(skip_memory(10, user_data), 10);
            assert_eq!(
                read_memory(buf.as_mut_ptr() as *mut c_void, 2, user_data),
                opj::OPJ_SIZE_T::MAX
            );
        }
        assert_eq!(stream.data.len(), 4);
    }

    #[test]
    fn negative_positions_are_refused() {
        let mut stream = writer();
        let user_data = &mut stream as *mut MemoryStream as *mut c_void;
        unsafe {
            assert_eq!(skip_memory(-1, user_data), -1);
            assert_eq!(seek_memory(-5, user_data), 0);
            assert_eq!(seek_memory(2, user_data), 1);
        }
        assert_eq!(stream.data, vec![0, 0]);
    }
}

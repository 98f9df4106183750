//! The `env` module required by AssemblyScript guests.
//!
//! Exports `abort` and `console.log`. AssemblyScript managed strings carry
//! their byte length in the 4 bytes before the data pointer and are encoded
//! UTF-16LE; bad pointers produce placeholder strings, never a host crash.

use anyhow::Result;
use tracing::{error, info};
use wasmtime::{Caller, Linker};

use crate::plugin::PluginState;

/// Refuse to decode strings claiming to be larger than this.
const MAX_STRING_BYTES: u32 = 1024 * 1024;

pub(crate) fn register_env(linker: &mut Linker<PluginState>) -> Result<()> {
    // abort(message_ptr, file_ptr, line, column): assertion failures and
    // runtime errors inside the guest.
    linker.func_wrap(
        "env",
        "abort",
        |mut caller: Caller<'_, PluginState>,
         message_ptr: i32,
         file_ptr: i32,
         line: i32,
         column: i32| {
            let message = read_assemblyscript_string(&mut caller, message_ptr as u32);
            let file = read_assemblyscript_string(&mut caller, file_ptr as u32);

            error!(
                plugin = %caller.data().plugin_ref,
                message = %message,
                file = %file,
                line,
                column,
                "guest abort"
            );
        },
    )?;

    // console.log(message_ptr)
    linker.func_wrap(
        "env",
        "console.log",
        |mut caller: Caller<'_, PluginState>, message_ptr: i32| {
            let message = read_assemblyscript_string(&mut caller, message_ptr as u32);
            info!(plugin = %caller.data().plugin_ref, "{}", message);
        },
    )?;

    Ok(())
}

/// Read an AssemblyScript managed string.
///
/// Layout: `ptr-4` holds the byte length (LE u32, already bytes rather than
/// code units); `ptr` starts the UTF-16LE data.
fn read_assemblyscript_string(caller: &mut Caller<'_, PluginState>, ptr: u32) -> String {
    if ptr == 0 {
        return String::new();
    }

    let Some(wasmtime::Extern::Memory(memory)) = caller.get_export("memory") else {
        return "<no memory>".to_string();
    };
    let data = memory.data(&caller);

    let Some(length_offset) = ptr.checked_sub(4) else {
        return "<invalid ptr>".to_string();
    };
    let Some(length_bytes) = data.get(length_offset as usize..ptr as usize) else {
        return "<invalid ptr>".to_string();
    };
    let byte_length = u32::from_le_bytes([
        length_bytes[0],
        length_bytes[1],
        length_bytes[2],
        length_bytes[3],
    ]);

    if byte_length > MAX_STRING_BYTES {
        return "<string too large>".to_string();
    }

    let start = ptr as usize;
    let Some(raw) = data.get(start..start + byte_length as usize) else {
        return "<read error>".to_string();
    };

    utf16le_to_string(raw)
}

fn utf16le_to_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16le_ascii() {
        let data: Vec<u8> = "hello"
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        assert_eq!(utf16le_to_string(&data), "hello");
    }

    #[test]
    fn utf16le_non_ascii() {
        let data: Vec<u8> = "héllo ✓"
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        assert_eq!(utf16le_to_string(&data), "héllo ✓");
    }

    #[test]
    fn utf16le_empty() {
        assert_eq!(utf16le_to_string(&[]), "");
    }

    #[test]
    fn utf16le_odd_trailing_byte_is_dropped() {
        let mut data: Vec<u8> = "ab"
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        data.push(0x41);
        assert_eq!(utf16le_to_string(&data), "ab");
    }
}

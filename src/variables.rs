use crate::script::ScriptError;

/// Process-wide global variable table, shared by every script in the
/// store. Two planes: full words and single bytes, addressed separately
/// by the corresponding operand kinds.
pub struct Globals {
    words: Vec<i32>,
    bytes: Vec<u8>,
}

impl Globals {
    pub fn new(words: usize, bytes: usize) -> Self {
        Globals {
            words: vec![0; words],
            bytes: vec![0; bytes],
        }
    }

    pub fn word(&self, index: i32) -> Result<i32, ScriptError> {
        self.words
            .get(index_of(index, self.words.len())?)
            .copied()
            .ok_or(ScriptError::VariableOutOfRange { index })
    }

    pub fn set_word(&mut self, index: i32, value: i32) -> Result<(), ScriptError> {
        let i = index_of(index, self.words.len())?;
        self.words[i] = value;
        Ok(())
    }

    pub fn byte(&self, index: i32) -> Result<i32, ScriptError> {
        self.bytes
            .get(index_of(index, self.bytes.len())?)
            .map(|b| i32::from(*b))
            .ok_or(ScriptError::VariableOutOfRange { index })
    }

    /// Byte writes truncate to the low 8 bits
    pub fn set_byte(&mut self, index: i32, value: i32) -> Result<(), ScriptError> {
        let i = index_of(index, self.bytes.len())?;
        self.bytes[i] = value as u8;
        Ok(())
    }

    /// Zero both planes, keeping their configured sizes
    pub fn reset(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

fn index_of(index: i32, len: usize) -> Result<usize, ScriptError> {
    if index < 0 || index as usize >= len {
        return Err(ScriptError::VariableOutOfRange { index });
    }
    Ok(index as usize)
}

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::{Vec3, Vec4};
use std::io::{Read, Result, Write};

/// Extension trait for reading little-endian vectors from a reader
pub trait ReadVectorExt: Read {
    fn read_vec3(&mut self) -> Result<Vec3> {
        let x = self.read_f32::<LittleEndian>()?;
        let y = self.read_f32::<LittleEndian>()?;
        let z = self.read_f32::<LittleEndian>()?;
        Ok(Vec3::new(x, y, z))
    }

    fn read_vec4(&mut self) -> Result<Vec4> {
        let x = self.read_f32::<LittleEndian>()?;
        let y = self.read_f32::<LittleEndian>()?;
        let z = self.read_f32::<LittleEndian>()?;
        let w = self.read_f32::<LittleEndian>()?;
        Ok(Vec4::new(x, y, z, w))
    }
}

/// Extension trait for writing little-endian vectors to a writer
pub trait WriteVectorExt: Write {
    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        self.write_f32::<LittleEndian>(v.z)
    }

    fn write_vec4(&mut self, v: Vec4) -> Result<()> {
        self.write_f32::<LittleEndian>(v.x)?;
        self.write_f32::<LittleEndian>(v.y)?;
        self.write_f32::<LittleEndian>(v.z)?;
        self.write_f32::<LittleEndian>(v.w)
    }
}

impl<R: Read + ?Sized> ReadVectorExt for R {}
impl<W: Write + ?Sized> WriteVectorExt for W {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_vec4_layout() {
        let mut data = Vec::new();
        data.write_vec4(Vec4::new(1.0, -2.0, 0.5, 1.0)).unwrap();

        assert_eq!(data.len(), 16);
        assert_eq!(&data[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&data[4..8], &(-2.0f32).to_le_bytes());

        let mut cursor = Cursor::new(data);
        assert_eq!(cursor.read_vec4().unwrap(), Vec4::new(1.0, -2.0, 0.5, 1.0));
    }

    #[test]
    fn test_vec3_short_read() {
        let mut cursor = Cursor::new(vec![0u8; 8]);
        assert!(cursor.read_vec3().is_err());
    }
}

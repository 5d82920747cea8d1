use std::io::Read;

pub trait ReadExt {
    fn read_all(&mut self) -> std::io::Result<Box<[u8]>>;
}

impl<T: Read> ReadExt for T {
    fn read_all(&mut self) -> std::io::Result<Box<[u8]>> {
        let mut data = Vec::new();
        self.read_to_end(&mut data)?;
        Ok(data.into_boxed_slice())
    }
}

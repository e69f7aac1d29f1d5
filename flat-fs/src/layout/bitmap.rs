/// 位图块视图，第`i`位位于第`i / 8`字节的第`i % 8`位，1表示已占用
#[derive(Debug)]
pub struct BitmapBlock<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BitmapBlock<'a> {
    #[inline]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn bits(&self) -> u64 {
        self.bytes.len() as u64 * 8
    }

    #[inline]
    pub fn get(&self, bit: u64) -> bool {
        self.bytes[(bit / 8) as usize] & (1 << (bit % 8)) != 0
    }

    pub fn set(&mut self, bit: u64, occupied: bool) {
        let byte = &mut self.bytes[(bit / 8) as usize];
        if occupied {
            *byte |= 1 << (bit % 8);
        } else {
            *byte &= !(1 << (bit % 8));
        }
    }

    /// 在`[first, last]`内寻找第一个为0的位
    pub fn find_first_free(&self, first: u64, last: u64) -> Option<u64> {
        let mut bit = first;
        while bit <= last {
            let byte = self.bytes[(bit / 8) as usize];
            // 整字节都被占用时直接跳到下一字节
            if byte == u8::MAX && bit % 8 == 0 {
                bit += 8;
                continue;
            }
            if byte & (1 << (bit % 8)) == 0 {
                return Some(bit);
            }
            bit += 1;
        }

        None
    }
}

//! 读写时宿主提供的缓冲区
//!
//! 宿主缓冲区可能只接收（或只交出）一部分数据，
//! 例如用户页未映射时的 copy_to_user / copy_from_user。
//! 因此两个接口都返回实际搬运的字节数，由文件系统决定如何继续。

/// 读操作的目的端
pub trait ReadBuf {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 把`src`放到缓冲区的`at`处，返回实际接收的字节数
    fn fill(&mut self, at: usize, src: &[u8]) -> usize;
}

/// 写操作的来源端
pub trait WriteBuf {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从缓冲区的`at`处取数据填满`dst`，返回实际取出的字节数
    fn drain(&self, at: usize, dst: &mut [u8]) -> usize;
}

impl ReadBuf for [u8] {
    #[inline]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn fill(&mut self, at: usize, src: &[u8]) -> usize {
        let n = src.len().min(<[u8]>::len(self).saturating_sub(at));
        if n == 0 {
            return 0;
        }
        self[at..at + n].copy_from_slice(&src[..n]);
        n
    }
}

impl WriteBuf for [u8] {
    #[inline]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn drain(&self, at: usize, dst: &mut [u8]) -> usize {
        let n = dst.len().min(<[u8]>::len(self).saturating_sub(at));
        if n == 0 {
            return 0;
        }
        dst[..n].copy_from_slice(&self[at..at + n]);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_fill_clamps() {
        let mut buf = [0u8; 4];
        assert_eq!(2, ReadBuf::fill(&mut buf[..], 2, b"abc"));
        assert_eq!(*b"\0\0ab", buf);
        assert_eq!(0, ReadBuf::fill(&mut buf[..], 4, b"x"));
    }

    #[test]
    fn slice_drain_clamps() {
        let src = *b"hello";
        let mut dst = [0u8; 8];
        assert_eq!(2, WriteBuf::drain(&src[..], 3, &mut dst));
        assert_eq!(b"lo", &dst[..2]);
    }
}

use super::{function_type::FunctionType, EofValidationError};
use crate::utils::read_u16;
use std::vec::Vec;

/// Marks the end of the section-header table.
pub const KIND_TERMINATOR: u8 = 0;
/// Type section kind, one per container.
pub const KIND_TYPE: u8 = 1;
/// Code section kind, carries a count-prefixed size vector.
pub const KIND_CODE: u8 = 2;
/// Data section kind, one per container, size may be zero.
pub const KIND_DATA: u8 = 3;
/// Container section kind, carries a count-prefixed size vector.
pub const KIND_CONTAINER: u8 = 4;

/// Maximum number of code sections in a single container.
pub const CODE_SECTION_LIMIT: usize = 1024;

/// EOF header, the validated shape of a container.
///
/// Offsets are absolute positions into the container they were parsed from and
/// are strictly increasing in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EofHeader {
    /// Size of every code section, in declaration order.
    ///
    /// Code size can't be zero.
    pub code_sizes: Vec<u16>,
    /// Offset of every code section start.
    pub code_offsets: Vec<usize>,
    /// Data section size.
    ///
    /// May be zero.
    pub data_size: u16,
    /// Size of every container section, in declaration order.
    pub container_sizes: Vec<u16>,
    /// Offset of every container section start.
    pub container_offsets: Vec<usize>,
    /// One function type per code section.
    pub types: Vec<FunctionType>,
}

/// Raw section-size table produced by the header state machine.
struct SectionHeaders {
    type_size: u16,
    code_sizes: Vec<u16>,
    data_size: u16,
    container_sizes: Vec<u16>,
    /// Offset one past the header terminator byte.
    header_size: usize,
}

/// Header parser state. Termination is the successful return out of
/// [`parse_section_headers`].
enum State {
    ReadKind,
    /// Reading the size vector of `kind`; `count` is 1 for type and data
    /// sections and the declared section count otherwise.
    ReadSize { kind: u8, count: usize },
}

/// Walks the section-header table starting right after the version byte.
///
/// Enforces section ordering, uniqueness and counts: kind `1`, then `2` with
/// a count-prefixed size vector, then `3`, then optionally `4`, then the `0`
/// terminator.
fn parse_section_headers(container: &[u8]) -> Result<SectionHeaders, EofValidationError> {
    use EofValidationError::*;

    let mut state = State::ReadKind;

    let mut type_size: Option<u16> = None;
    let mut data_size: Option<u16> = None;
    let mut code_sizes: Vec<u16> = Vec::new();
    let mut container_sizes: Vec<u16> = Vec::new();
    let mut container_seen = false;

    // Skip magic and version.
    let mut pos = 3;
    while pos < container.len() {
        match state {
            State::ReadKind => {
                let kind = container[pos];
                pos += 1;
                match kind {
                    KIND_TERMINATOR => {
                        let Some(type_size) = type_size else {
                            return Err(TypeSectionMissing);
                        };
                        if code_sizes.is_empty() {
                            return Err(CodeSectionMissing);
                        }
                        let Some(data_size) = data_size else {
                            return Err(DataSectionMissing);
                        };
                        return Ok(SectionHeaders {
                            type_size,
                            code_sizes,
                            data_size,
                            container_sizes,
                            header_size: pos,
                        });
                    }
                    KIND_TYPE => {
                        if type_size.is_some() {
                            return Err(MultipleTypeSections);
                        }
                        if !code_sizes.is_empty() {
                            return Err(CodeSectionBeforeTypeSection);
                        }
                        state = State::ReadSize { kind, count: 1 };
                    }
                    KIND_CODE => {
                        if type_size.is_none() {
                            return Err(CodeSectionBeforeTypeSection);
                        }
                        if data_size.is_some() {
                            return Err(DataSectionBeforeCodeSection);
                        }
                        if !code_sizes.is_empty() {
                            return Err(MultipleCodeSectionsHeaders);
                        }
                        if container.len() - pos < 2 {
                            return Err(IncompleteSectionNumber);
                        }
                        let count = read_u16(container, pos) as usize;
                        pos += 2;
                        if count == 0 {
                            return Err(ZeroSectionSize);
                        }
                        state = State::ReadSize { kind, count };
                    }
                    KIND_DATA => {
                        if type_size.is_none() {
                            return Err(DataSectionBeforeTypesSection);
                        }
                        if code_sizes.is_empty() {
                            return Err(DataSectionBeforeCodeSection);
                        }
                        if data_size.is_some() {
                            return Err(MultipleDataSections);
                        }
                        state = State::ReadSize { kind, count: 1 };
                    }
                    KIND_CONTAINER => {
                        if type_size.is_none() {
                            return Err(ContainerSectionBeforeTypeSection);
                        }
                        if code_sizes.is_empty() {
                            return Err(ContainerSectionBeforeCodeSection);
                        }
                        if container_seen {
                            return Err(MultipleContainerSectionsHeaders);
                        }
                        if container.len() - pos < 2 {
                            return Err(IncompleteSectionNumber);
                        }
                        let count = read_u16(container, pos) as usize;
                        pos += 2;
                        if count == 0 {
                            return Err(ZeroSectionSize);
                        }
                        container_seen = true;
                        state = State::ReadSize { kind, count };
                    }
                    _ => return Err(UnknownSectionId),
                }
            }
            State::ReadSize { kind, count } => {
                if kind == KIND_CODE || kind == KIND_CONTAINER {
                    for _ in 0..count {
                        if container.len() - pos < 2 {
                            return Err(IncompleteSectionSize);
                        }
                        let size = read_u16(container, pos);
                        pos += 2;
                        if size == 0 {
                            return Err(ZeroSectionSize);
                        }
                        if kind == KIND_CODE {
                            if code_sizes.len() == CODE_SECTION_LIMIT {
                                return Err(TooManyCodeSections);
                            }
                            code_sizes.push(size);
                        } else {
                            container_sizes.push(size);
                        }
                    }
                } else {
                    // Type or data section, a single size.
                    if container.len() - pos < 2 {
                        return Err(IncompleteSectionSize);
                    }
                    let size = read_u16(container, pos);
                    pos += 2;
                    if size == 0 && kind != KIND_DATA {
                        return Err(ZeroSectionSize);
                    }
                    if kind == KIND_TYPE {
                        type_size = Some(size);
                    } else {
                        data_size = Some(size);
                    }
                }
                state = State::ReadKind;
            }
        }
    }

    Err(SectionHeadersNotTerminated)
}

impl EofHeader {
    /// Parses and validates the section-header table, the body layout and the
    /// type section of `container`.
    ///
    /// The magic and version prefix must have been checked by the caller. Code
    /// and container bodies are not inspected here.
    pub fn parse(container: &[u8]) -> Result<Self, EofValidationError> {
        let SectionHeaders {
            type_size,
            code_sizes,
            data_size,
            container_sizes,
            header_size,
        } = parse_section_headers(container)?;

        let body_size = type_size as usize
            + code_sizes.iter().map(|s| *s as usize).sum::<usize>()
            + data_size as usize
            + container_sizes.iter().map(|s| *s as usize).sum::<usize>();
        if body_size != container.len() - header_size {
            return Err(EofValidationError::InvalidSectionBodiesSize);
        }

        if type_size as usize != code_sizes.len() * FunctionType::ENCODED_SIZE {
            return Err(EofValidationError::InvalidTypeSectionSize);
        }

        let mut types = Vec::with_capacity(code_sizes.len());
        for offset in
            (header_size..header_size + type_size as usize).step_by(FunctionType::ENCODED_SIZE)
        {
            types.push(FunctionType::decode(&container[offset..]));
        }

        // The first function is the container entry point and takes no
        // arguments from and leaves nothing on the operand stack.
        if types[0].inputs != 0 || types[0].outputs != 0 {
            return Err(EofValidationError::InvalidFirstSectionType);
        }
        for ty in &types {
            ty.validate()?;
        }

        let mut offset = header_size + type_size as usize;
        let mut code_offsets = Vec::with_capacity(code_sizes.len());
        for size in &code_sizes {
            code_offsets.push(offset);
            offset += *size as usize;
        }
        offset += data_size as usize;
        let mut container_offsets = Vec::with_capacity(container_sizes.len());
        for size in &container_sizes {
            container_offsets.push(offset);
            offset += *size as usize;
        }

        Ok(Self {
            code_sizes,
            code_offsets,
            data_size,
            container_sizes,
            container_offsets,
            types,
        })
    }

    /// Reads the header of a container that is already known to be valid.
    ///
    /// Skips every check performed by [`parse`](Self::parse). Must not be
    /// called on unvalidated input; doing so may panic or return garbage.
    pub fn read_valid(container: &[u8]) -> Self {
        let mut type_size = 0usize;
        let mut code_sizes: Vec<u16> = Vec::new();
        let mut data_size = 0u16;
        let mut container_sizes: Vec<u16> = Vec::new();

        let mut pos = 3;
        while container[pos] != KIND_TERMINATOR {
            let kind = container[pos];
            pos += 1;
            match kind {
                KIND_CODE | KIND_CONTAINER => {
                    let count = read_u16(container, pos) as usize;
                    pos += 2;
                    let sizes = if kind == KIND_CODE {
                        &mut code_sizes
                    } else {
                        &mut container_sizes
                    };
                    sizes.reserve(count);
                    for _ in 0..count {
                        sizes.push(read_u16(container, pos));
                        pos += 2;
                    }
                }
                KIND_TYPE => {
                    type_size = read_u16(container, pos) as usize;
                    pos += 2;
                }
                _ => {
                    // KIND_DATA; no other kind appears in a valid header.
                    data_size = read_u16(container, pos);
                    pos += 2;
                }
            }
        }
        let header_size = pos + 1;

        let mut types = Vec::with_capacity(code_sizes.len());
        for offset in (header_size..header_size + type_size).step_by(FunctionType::ENCODED_SIZE) {
            types.push(FunctionType::decode(&container[offset..]));
        }

        let mut offset = header_size + type_size;
        let mut code_offsets = Vec::with_capacity(code_sizes.len());
        for size in &code_sizes {
            code_offsets.push(offset);
            offset += *size as usize;
        }
        offset += data_size as usize;
        let mut container_offsets = Vec::with_capacity(container_sizes.len());
        for size in &container_sizes {
            container_offsets.push(offset);
            offset += *size as usize;
        }

        Self {
            code_sizes,
            code_offsets,
            data_size,
            container_sizes,
            container_offsets,
            types,
        }
    }

    /// Returns the length of the encoded header in bytes.
    ///
    /// It is minimum 15 bytes (there is at least one code section).
    pub fn size(&self) -> usize {
        3 + // Magic + version
        3 + // Type section
        3 + 2 * self.code_sizes.len() + // Code sections
        3 + // Data section
        if self.container_sizes.is_empty() { 0 } else { 3 + 2 * self.container_sizes.len() } +
        1 // Terminator
    }

    /// Returns the total size of all section bodies.
    pub fn body_size(&self) -> usize {
        self.types.len() * FunctionType::ENCODED_SIZE
            + self.code_sizes.iter().map(|s| *s as usize).sum::<usize>()
            + self.data_size as usize
            + self
                .container_sizes
                .iter()
                .map(|s| *s as usize)
                .sum::<usize>()
    }

    /// Returns the container length implied by the header.
    pub fn eof_size(&self) -> usize {
        self.size() + self.body_size()
    }

    /// Returns the offset of the indexed code section start.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn code_begin(&self, index: usize) -> usize {
        self.code_offsets[index]
    }

    /// Returns the offset of the indexed code section end.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn code_end(&self, index: usize) -> usize {
        self.code_offsets[index] + self.code_sizes[index] as usize
    }

    /// Returns the offset of the indexed container section start.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn container_begin(&self, index: usize) -> usize {
        self.container_offsets[index]
    }

    /// Returns the offset of the indexed container section end.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn container_end(&self, index: usize) -> usize {
        self.container_offsets[index] + self.container_sizes[index] as usize
    }

    /// Returns the size of the indexed container section.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[inline]
    pub fn container_size(&self, index: usize) -> usize {
        self.container_sizes[index] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;
    use std::vec;

    #[test]
    fn sanity_header_parse() {
        let input = hex!("ef000101000402000100010300000000000000fe");
        let header = EofHeader::parse(&input).unwrap();
        assert_eq!(header.types, vec![FunctionType::new(0, 0, 0)]);
        assert_eq!(header.code_sizes, vec![1]);
        assert_eq!(header.code_offsets, vec![19]);
        assert_eq!(header.data_size, 0);
        assert_eq!(header.container_sizes, Vec::new());
        assert_eq!(header.size(), 15);
        assert_eq!(header.eof_size(), input.len());
    }

    #[test]
    fn headers_not_terminated() {
        for input in [
            hex!("ef0001").as_slice(),
            &hex!("ef000101"),
            &hex!("ef0001010004"),
            &hex!("ef0001010004020001"),
            &hex!("ef00010100040200010001030001"),
        ] {
            assert_eq!(
                EofHeader::parse(input),
                Err(EofValidationError::SectionHeadersNotTerminated),
                "{}",
                hex::encode(input)
            );
        }
    }

    #[test]
    fn incomplete_sizes_and_numbers() {
        assert_eq!(
            EofHeader::parse(&hex!("ef00010100")),
            Err(EofValidationError::IncompleteSectionSize)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000402")),
            Err(EofValidationError::IncompleteSectionNumber)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef00010100040200")),
            Err(EofValidationError::IncompleteSectionNumber)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000402000100")),
            Err(EofValidationError::IncompleteSectionSize)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004020001000103 00")),
            Err(EofValidationError::IncompleteSectionSize)
        );
    }

    #[test]
    fn missing_sections() {
        assert_eq!(
            EofHeader::parse(&hex!("ef000100")),
            Err(EofValidationError::TypeSectionMissing)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000400")),
            Err(EofValidationError::CodeSectionMissing)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef00010100040200010001000000 0000fe")),
            Err(EofValidationError::DataSectionMissing)
        );
    }

    #[test]
    fn section_ordering() {
        // Code before type.
        assert_eq!(
            EofHeader::parse(&hex!("ef00010200010001010004 00 00000000fe")),
            Err(EofValidationError::CodeSectionBeforeTypeSection)
        );
        // Data before type.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001030001010004020001000100 aa00000000fe")),
            Err(EofValidationError::DataSectionBeforeTypesSection)
        );
        // Data before code.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004030001020001000100 00000000aafe")),
            Err(EofValidationError::DataSectionBeforeCodeSection)
        );
        // Container before code.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004040001001402000100010300000000000000fe")),
            Err(EofValidationError::ContainerSectionBeforeCodeSection)
        );
    }

    #[test]
    fn duplicate_sections() {
        assert_eq!(
            EofHeader::parse(&hex!(
                "ef0001010004010004020002000100010300000000000000 00000000fefe"
            )),
            Err(EofValidationError::MultipleTypeSections)
        );
        assert_eq!(
            EofHeader::parse(&hex!(
                "ef000101000402000100010200010001030000 00 00000000fefe"
            )),
            Err(EofValidationError::MultipleCodeSectionsHeaders)
        );
        assert_eq!(
            EofHeader::parse(&hex!(
                "ef00010100040200010001030001030001 00 00000000fe aa aa"
            )),
            Err(EofValidationError::MultipleDataSections)
        );
    }

    #[test]
    fn unknown_section_kind() {
        assert_eq!(
            EofHeader::parse(&hex!("ef0001050001 00 fe")),
            Err(EofValidationError::UnknownSectionId)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef0001ff0001 00 fe")),
            Err(EofValidationError::UnknownSectionId)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef00010100040200010001030001ff0001 00 00000000 fe aa 00")),
            Err(EofValidationError::UnknownSectionId)
        );
    }

    #[test]
    fn zero_sizes() {
        // Zero type-section size.
        assert_eq!(
            EofHeader::parse(&hex!("ef00010100000200010001030000 00 fe")),
            Err(EofValidationError::ZeroSectionSize)
        );
        // Zero code-section count.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004020000030000 00 00000000")),
            Err(EofValidationError::ZeroSectionSize)
        );
        // Zero code-section size.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004020001000003 0000 00 00000000")),
            Err(EofValidationError::ZeroSectionSize)
        );
        // Zero data size is legal.
        assert!(EofHeader::parse(&hex!("ef000101000402000100010300000000000000fe")).is_ok());
    }

    #[test]
    fn bodies_size_mismatch() {
        // Code body shorter than declared.
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010004020001000203000000 00000000fe")),
            Err(EofValidationError::InvalidSectionBodiesSize)
        );
        // Trailing bytes after the declared bodies.
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000402000100010300000000000000fe deadbeef")),
            Err(EofValidationError::InvalidSectionBodiesSize)
        );
    }

    #[test]
    fn type_section_size_mismatch() {
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010008020001000103000000 0000000000000000 fe")),
            Err(EofValidationError::InvalidTypeSectionSize)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef0001010002020001000103000000 0000 fe")),
            Err(EofValidationError::InvalidTypeSectionSize)
        );
    }

    #[test]
    fn first_type_must_be_void() {
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000402000100030300000000010000 600000")),
            Err(EofValidationError::InvalidFirstSectionType)
        );
        assert_eq!(
            EofHeader::parse(&hex!("ef000101000402000100020300000001000000 5000")),
            Err(EofValidationError::InvalidFirstSectionType)
        );
    }

    #[test]
    fn type_limits() {
        // Second function declares 1025 max stack.
        assert_eq!(
            EofHeader::parse(&hex!(
                "ef000101000802000200010001030000 00 00000000 00000401 fe fe"
            )),
            Err(EofValidationError::MaxStackHeightAboveLimit)
        );
        // Second function declares 128 inputs.
        assert_eq!(
            EofHeader::parse(&hex!(
                "ef000101000802000200010001030000 00 00000000 80000000 fe fe"
            )),
            Err(EofValidationError::InputsOutputsNumAboveLimit)
        );
    }

    #[test]
    fn too_many_code_sections() {
        let build = |count: usize| {
            let mut c = hex!("ef0001").to_vec();
            c.push(KIND_TYPE);
            c.extend(((count * 4) as u16).to_be_bytes());
            c.push(KIND_CODE);
            c.extend((count as u16).to_be_bytes());
            for _ in 0..count {
                c.extend(1u16.to_be_bytes());
            }
            c.extend(hex!("030000 00"));
            for _ in 0..count {
                c.extend(hex!("00000000"));
            }
            c.extend(core::iter::repeat(0xFE).take(count));
            c
        };

        assert!(EofHeader::parse(&build(1024)).is_ok());
        assert_eq!(
            EofHeader::parse(&build(1025)),
            Err(EofValidationError::TooManyCodeSections)
        );
    }

    #[test]
    fn read_valid_roundtrip() {
        let input = hex!("ef000101000802000200020001030004 00 0000000000000000 fefe fe aabbccdd");
        let parsed = EofHeader::parse(&input).unwrap();
        let read = EofHeader::read_valid(&input);
        assert_eq!(parsed, read);
        assert_eq!(read.code_sizes, vec![2, 1]);
        assert_eq!(read.code_offsets, vec![25, 27]);
        assert_eq!(read.data_size, 4);
        assert_eq!(read.size() + read.body_size(), input.len());
    }

    #[test]
    fn read_valid_with_container() {
        // One embedded minimal container after two data bytes.
        let sub = hex!("ef000101000402000100010300000000000000fe");
        let mut input =
            hex!("ef00010100040200010001030002040001001400 00000000 fe aabb").to_vec();
        input.extend(sub);
        let header = EofHeader::read_valid(&input);
        assert_eq!(header.container_sizes, vec![20]);
        assert_eq!(header.container_begin(0), input.len() - 20);
        assert_eq!(header.container_end(0), input.len());
        assert_eq!(header.eof_size(), input.len());
    }
}

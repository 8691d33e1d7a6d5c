//! EOF container format.
//!
//! Contains the header/type-table parser, the code validation pipeline and a
//! pretty printer for code sections.
mod function_type;
mod header;
/// Pretty printer for EOF code sections. Enabled by `std` feature.
pub mod printer;
/// Validation pipeline for EOF containers.
pub mod validation;

pub use function_type::{FunctionType, INPUTS_OUTPUTS_LIMIT, MAX_STACK_HEIGHT};
pub use header::{
    EofHeader, CODE_SECTION_LIMIT, KIND_CODE, KIND_CONTAINER, KIND_DATA, KIND_TERMINATOR, KIND_TYPE,
};
pub use validation::validate_eof;

use core::fmt;
use std::vec::Vec;

/// EOF magic in [u16] form.
pub const EOF_MAGIC: u16 = 0xEF00;

/// EOF magic prefix in array form.
pub const EOF_MAGIC_BYTES: [u8; 2] = [0xEF, 0x00];

/// Returns `true` if the container starts with the EOF prefix.
///
/// Does not inspect the container any further.
#[inline]
pub fn is_eof_container(container: &[u8]) -> bool {
    container.len() >= 2 && container[..2] == EOF_MAGIC_BYTES
}

/// Returns the container version byte.
///
/// If the prefix is missing or invalid, 0 is returned meaning legacy code.
#[inline]
pub fn eof_version(container: &[u8]) -> u8 {
    if container.len() >= 3 && container[..2] == EOF_MAGIC_BYTES {
        container[2]
    } else {
        0
    }
}

/// Appends `aux_data` to the data section of an already-validated container
/// and updates the data-size field of the header in place.
///
/// The bytes are inserted immediately before the first embedded container, or
/// at the container end if there is none, so the data body stays contiguous.
/// Returns `false` without touching the container if the resulting data size
/// would not fit the 16-bit size field. No revalidation is performed.
///
/// # Panics
///
/// May panic if the container has not been accepted by [`validate_eof`].
pub fn append_data_section(container: &mut Vec<u8>, aux_data: &[u8]) -> bool {
    let header = EofHeader::read_valid(container);
    let new_data_size = header.data_size as usize + aux_data.len();
    if new_data_size > u16::MAX as usize {
        return false;
    }

    let insert_pos = if header.container_offsets.is_empty() {
        container.len()
    } else {
        header.container_begin(0)
    };
    let tail = container.split_off(insert_pos);
    container.extend_from_slice(aux_data);
    container.extend(tail);

    // magic(2) + version(1) + type header(3) + code header(3 + 2 per section) + data kind(1)
    let data_size_pos = 10 + 2 * header.code_sizes.len();
    container[data_size_pos..data_size_pos + 2]
        .copy_from_slice(&(new_data_size as u16).to_be_bytes());
    true
}

/// EOF validation error.
///
/// A closed set; validation aborts on the first error encountered and returns
/// it unchanged, including from embedded containers.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EofValidationError {
    /// Container is too short for the magic and version or the magic does not match.
    InvalidPrefix,
    /// Version byte is not 1 or the revision predates EOF.
    EofVersionUnknown,
    /// Header ran out of bytes in the middle of a section size.
    IncompleteSectionSize,
    /// Header ran out of bytes in the middle of a section count.
    IncompleteSectionNumber,
    /// Header was terminated without a code section.
    CodeSectionMissing,
    /// Header was terminated without a type section.
    TypeSectionMissing,
    /// Header was terminated without a data section.
    DataSectionMissing,
    /// More than one data section header.
    MultipleDataSections,
    /// Section kind byte is not one of the known identifiers.
    UnknownSectionId,
    /// Section size or section count is zero where it must not be.
    ZeroSectionSize,
    /// Container ended before the header terminator byte.
    SectionHeadersNotTerminated,
    /// Declared section sizes do not add up to the remaining container length.
    InvalidSectionBodiesSize,
    /// Opcode is not defined at this revision.
    UndefinedInstruction,
    /// `RJUMPV` count byte is missing.
    TruncatedInstruction,
    /// `RJUMPV` table has zero entries.
    InvalidRjumpvCount,
    /// Relative jump target is out of the code section or inside an immediate.
    InvalidRjumpDestination,
    /// Code section header seen before the type section header.
    CodeSectionBeforeTypeSection,
    /// More than one type section header.
    MultipleTypeSections,
    /// More than one code section header group.
    MultipleCodeSectionsHeaders,
    /// More code sections than the limit allows.
    TooManyCodeSections,
    /// Data section header seen before the code section header.
    DataSectionBeforeCodeSection,
    /// Data section header seen before the type section header.
    DataSectionBeforeTypesSection,
    /// Type section size does not match the number of code sections.
    InvalidTypeSectionSize,
    /// First function type is not `(0, 0)`.
    InvalidFirstSectionType,
    /// Declared maximum stack height differs from the computed one.
    InvalidMaxStackHeight,
    /// Code section does not end with a terminating instruction, or the last
    /// instruction's immediates are cut by the section boundary.
    MissingTerminatingInstruction,
    /// Same offset reached with two different stack heights.
    StackHeightMismatch,
    /// `RETF` executed with a stack height different from the function outputs.
    NonEmptyStackOnTerminatingInstruction,
    /// Declared maximum stack height is above the limit.
    MaxStackHeightAboveLimit,
    /// Function inputs or outputs are above the limit.
    InputsOutputsNumAboveLimit,
    /// Some instruction is not reachable from the section start.
    UnreachableInstructions,
    /// Instruction needs more stack items than are available.
    StackUnderflow,
    /// `CALLF` target function index is out of bounds.
    InvalidCodeSectionIndex,
    /// More than one container section header group.
    MultipleContainerSectionsHeaders,
    /// Container section header seen before the type section header.
    ContainerSectionBeforeTypeSection,
    /// Container section header seen before the code section header.
    ContainerSectionBeforeCodeSection,
}

impl EofValidationError {
    /// Returns the stable snake-case token for this error.
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidPrefix => "invalid_prefix",
            Self::EofVersionUnknown => "eof_version_unknown",
            Self::IncompleteSectionSize => "incomplete_section_size",
            Self::IncompleteSectionNumber => "incomplete_section_number",
            Self::CodeSectionMissing => "code_section_missing",
            Self::TypeSectionMissing => "type_section_missing",
            Self::DataSectionMissing => "data_section_missing",
            Self::MultipleDataSections => "multiple_data_sections",
            Self::UnknownSectionId => "unknown_section_id",
            Self::ZeroSectionSize => "zero_section_size",
            Self::SectionHeadersNotTerminated => "section_headers_not_terminated",
            Self::InvalidSectionBodiesSize => "invalid_section_bodies_size",
            Self::UndefinedInstruction => "undefined_instruction",
            Self::TruncatedInstruction => "truncated_instruction",
            Self::InvalidRjumpvCount => "invalid_rjumpv_count",
            Self::InvalidRjumpDestination => "invalid_rjump_destination",
            Self::CodeSectionBeforeTypeSection => "code_section_before_type_section",
            Self::MultipleTypeSections => "multiple_type_sections",
            Self::MultipleCodeSectionsHeaders => "multiple_code_sections_headers",
            Self::TooManyCodeSections => "too_many_code_sections",
            Self::DataSectionBeforeCodeSection => "data_section_before_code_section",
            Self::DataSectionBeforeTypesSection => "data_section_before_types_section",
            Self::InvalidTypeSectionSize => "invalid_type_section_size",
            Self::InvalidFirstSectionType => "invalid_first_section_type",
            Self::InvalidMaxStackHeight => "invalid_max_stack_height",
            Self::MissingTerminatingInstruction => "missing_terminating_instruction",
            Self::StackHeightMismatch => "stack_height_mismatch",
            Self::NonEmptyStackOnTerminatingInstruction => {
                "non_empty_stack_on_terminating_instruction"
            }
            Self::MaxStackHeightAboveLimit => "max_stack_height_above_limit",
            Self::InputsOutputsNumAboveLimit => "inputs_outputs_num_above_limit",
            Self::UnreachableInstructions => "unreachable_instructions",
            Self::StackUnderflow => "stack_underflow",
            Self::InvalidCodeSectionIndex => "invalid_code_section_index",
            Self::MultipleContainerSectionsHeaders => "multiple_container_sections_headers",
            Self::ContainerSectionBeforeTypeSection => "container_section_before_type_section",
            Self::ContainerSectionBeforeCodeSection => "container_section_before_code_section",
        }
    }
}

impl fmt::Display for EofValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl core::error::Error for EofValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn eof_prefix() {
        assert_eq!(EOF_MAGIC.to_be_bytes(), EOF_MAGIC_BYTES);
        assert!(is_eof_container(&hex!("ef00")));
        assert!(is_eof_container(&hex!("ef0001deadbeef")));
        assert!(!is_eof_container(&hex!("ef")));
        assert!(!is_eof_container(&hex!("ef01")));
        assert!(!is_eof_container(&[]));
    }

    #[test]
    fn version_of_legacy_and_eof() {
        assert_eq!(eof_version(&hex!("ef0001")), 1);
        assert_eq!(eof_version(&hex!("ef0002")), 2);
        // Prefix too short or mismatched means legacy.
        assert_eq!(eof_version(&hex!("ef00")), 0);
        assert_eq!(eof_version(&hex!("6001600155")), 0);
    }

    #[test]
    fn error_tokens_are_stable() {
        assert_eq!(EofValidationError::InvalidPrefix.message(), "invalid_prefix");
        assert_eq!(
            EofValidationError::SectionHeadersNotTerminated.message(),
            "section_headers_not_terminated"
        );
        assert_eq!(
            EofValidationError::NonEmptyStackOnTerminatingInstruction.message(),
            "non_empty_stack_on_terminating_instruction"
        );
        assert_eq!(
            EofValidationError::MissingTerminatingInstruction.to_string(),
            "missing_terminating_instruction"
        );
    }
}

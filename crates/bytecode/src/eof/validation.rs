//! EOF container validation pipeline.
//!
//! A container is checked in stages, each of which can short-circuit: prefix
//! and version, section headers and body layout, type section, then per code
//! section an instruction scan, a relative-jump destination check and a
//! stack-height dataflow. Embedded containers go through the same pipeline.

use crate::{
    eof::{
        function_type::FunctionType, header::EofHeader, EofValidationError, EOF_MAGIC_BYTES,
    },
    opcode::{self, InstructionTable, OPCODE_INFO},
    utils::{read_i16, read_u16},
};
use bitvec::{bitvec, vec::BitVec};
use specification::SpecId;
use std::{vec, vec::Vec};

/// Validates `container` as an EOF object under the rules of `spec`.
///
/// On success returns the header of the outermost container. Embedded
/// containers are validated with the same revision; the first error found
/// anywhere is returned unchanged.
pub fn validate_eof(spec: SpecId, container: &[u8]) -> Result<EofHeader, EofValidationError> {
    let header = validate_container(spec, container)?;

    // Embedded containers, iteratively. Ranges are absolute into the
    // outermost byte sequence so nesting depth costs no call stack.
    let mut work: Vec<(usize, usize)> = Vec::new();
    push_subcontainers(&header, 0, &mut work);
    while let Some((begin, size)) = work.pop() {
        let sub_header = validate_container(spec, &container[begin..begin + size])?;
        push_subcontainers(&sub_header, begin, &mut work);
    }

    Ok(header)
}

fn push_subcontainers(header: &EofHeader, base: usize, work: &mut Vec<(usize, usize)>) {
    for index in 0..header.container_sizes.len() {
        work.push((base + header.container_begin(index), header.container_size(index)));
    }
}

/// Validates a single container without descending into embedded ones.
fn validate_container(
    spec: SpecId,
    container: &[u8],
) -> Result<EofHeader, EofValidationError> {
    if container.len() < 3 || container[..2] != EOF_MAGIC_BYTES {
        return Err(EofValidationError::InvalidPrefix);
    }
    if !spec.is_enabled_in(SpecId::EOF_INTRODUCED) || container[2] != 1 {
        return Err(EofValidationError::EofVersionUnknown);
    }

    let header = EofHeader::parse(container)?;

    let table = InstructionTable::new_eof(spec);
    for index in 0..header.code_sizes.len() {
        let code = &container[header.code_begin(index)..header.code_end(index)];
        validate_instructions(&table, code)?;
        validate_rjump_destinations(code)?;
        let observed_max = validate_stack_heights(code, index, &header.types)?;
        if observed_max != header.types[index].max_stack as i32 {
            return Err(EofValidationError::InvalidMaxStackHeight);
        }
    }

    Ok(header)
}

/// Linear scan over one code section.
///
/// Checks that every opcode is defined at this revision, that immediates are
/// complete, and that the section ends on a terminating instruction.
fn validate_instructions(
    table: &InstructionTable,
    code: &[u8],
) -> Result<(), EofValidationError> {
    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let Some(info) = table.get(op) else {
            return Err(EofValidationError::UndefinedInstruction);
        };

        let immediate_size = if op == opcode::RJUMPV {
            // The jump table length is data-dependent.
            let Some(count) = code.get(i + 1) else {
                return Err(EofValidationError::TruncatedInstruction);
            };
            if *count == 0 {
                return Err(EofValidationError::InvalidRjumpvCount);
            }
            1 + 2 * *count as usize
        } else {
            info.immediate_size() as usize
        };

        let next = i + 1 + immediate_size;
        if next >= code.len() {
            // This is the final instruction of the section. Its immediates
            // must fit and it must not fall through the section end.
            if next > code.len() || !info.is_terminating() {
                return Err(EofValidationError::MissingTerminatingInstruction);
            }
        }
        i = next;
    }
    Ok(())
}

/// Checks every `RJUMP`/`RJUMPI`/`RJUMPV` destination in one code section.
///
/// Destinations must land on an opcode byte inside the section; the header,
/// the data section, and immediate operands are all unreachable. Runs after
/// [`validate_instructions`], so instruction boundaries are trusted.
fn validate_rjump_destinations(code: &[u8]) -> Result<(), EofValidationError> {
    let mut immediate_mask: BitVec = bitvec![0; code.len()];
    let mut targets: Vec<usize> = Vec::new();

    let push_target = |targets: &mut Vec<usize>, target: isize| {
        if target < 0 || target >= code.len() as isize {
            return Err(EofValidationError::InvalidRjumpDestination);
        }
        targets.push(target as usize);
        Ok(())
    };

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let immediate_size = match op {
            opcode::RJUMP | opcode::RJUMPI => {
                let offset = read_i16(code, i + 1) as isize;
                push_target(&mut targets, i as isize + 3 + offset)?;
                2
            }
            opcode::RJUMPV => {
                let count = code[i + 1] as usize;
                // Targets are relative to the byte after the whole jump table.
                let base = i + 2 + 2 * count;
                for entry in 0..count {
                    let offset = read_i16(code, i + 2 + 2 * entry) as isize;
                    push_target(&mut targets, base as isize + offset)?;
                }
                1 + 2 * count
            }
            _ => OPCODE_INFO[op as usize].map_or(0, |info| info.immediate_size() as usize),
        };

        for byte in i + 1..=i + immediate_size {
            immediate_mask.set(byte, true);
        }
        i += 1 + immediate_size;
    }

    // Backward and forward targets alike are only known to be opcode starts
    // once the whole mask is built.
    for target in targets {
        if immediate_mask[target] {
            return Err(EofValidationError::InvalidRjumpDestination);
        }
    }
    Ok(())
}

/// Dataflow cell for one code offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cell {
    /// Never reached by the analysis.
    Unvisited,
    /// Byte lies inside an immediate operand.
    Immediate,
    /// Operand stack height at this instruction start.
    Height(i32),
}

/// Forward fixed-point over one code section computing per-offset stack
/// heights.
///
/// Returns the observed maximum height; the caller compares it against the
/// declared one. Runs after the scan and jump-destination passes, so
/// instruction boundaries and jump targets are trusted.
fn validate_stack_heights(
    code: &[u8],
    func_index: usize,
    types: &[FunctionType],
) -> Result<i32, EofValidationError> {
    let this_type = &types[func_index];

    let mut heights = vec![Cell::Unvisited; code.len()];
    heights[0] = Cell::Height(this_type.inputs as i32);
    let mut worklist = vec![0usize];
    let mut successors: Vec<usize> = Vec::new();

    while let Some(i) = worklist.pop() {
        let op = code[i];
        let Some(info) = OPCODE_INFO[op as usize] else {
            return Err(EofValidationError::UndefinedInstruction);
        };
        let Cell::Height(height) = heights[i] else {
            // Offsets are assigned a height before they are queued.
            unreachable!("worklist entry without stack height");
        };

        let mut required = info.inputs() as i32;
        let mut delta = info.io_diff() as i32;
        if op == opcode::CALLF {
            let fid = read_u16(code, i + 1) as usize;
            let Some(target) = types.get(fid) else {
                return Err(EofValidationError::InvalidCodeSectionIndex);
            };
            required = target.inputs as i32;
            delta = target.io_diff();
        }

        if height < required {
            return Err(EofValidationError::StackUnderflow);
        }

        let immediate_size = if op == opcode::RJUMPV {
            1 + 2 * code[i + 1] as usize
        } else {
            info.immediate_size() as usize
        };

        successors.clear();

        // Fall-through successor. RJUMP always transfers control and RJUMPV
        // is handled below with its data-dependent width.
        if op != opcode::RJUMP && op != opcode::RJUMPV && !info.is_terminating() {
            let next = i + 1 + immediate_size;
            if next >= code.len() {
                return Err(EofValidationError::MissingTerminatingInstruction);
            }
            successors.push(next);
        }
        match op {
            opcode::RJUMP | opcode::RJUMPI => {
                let offset = read_i16(code, i + 1) as i32;
                successors.push((i as i32 + 3 + offset) as usize);
            }
            opcode::RJUMPV => {
                let count = code[i + 1] as usize;
                let next = i + 2 + 2 * count;
                if next >= code.len() {
                    return Err(EofValidationError::MissingTerminatingInstruction);
                }
                successors.push(next);
                for entry in 0..count {
                    let offset = read_i16(code, i + 2 + 2 * entry) as i32;
                    successors.push((next as i32 + offset) as usize);
                }
            }
            _ => {}
        }

        for byte in i + 1..=i + immediate_size {
            heights[byte] = Cell::Immediate;
        }

        for &successor in &successors {
            match heights[successor] {
                Cell::Unvisited => {
                    heights[successor] = Cell::Height(height + delta);
                    worklist.push(successor);
                }
                Cell::Height(existing) if existing == height + delta => {}
                _ => return Err(EofValidationError::StackHeightMismatch),
            }
        }

        if op == opcode::RETF && height != this_type.outputs as i32 {
            return Err(EofValidationError::NonEmptyStackOnTerminatingInstruction);
        }
    }

    let mut observed_max = 0;
    for cell in &heights {
        match cell {
            Cell::Unvisited => return Err(EofValidationError::UnreachableInstructions),
            Cell::Height(height) => observed_max = observed_max.max(*height),
            Cell::Immediate => {}
        }
    }
    Ok(observed_max)
}

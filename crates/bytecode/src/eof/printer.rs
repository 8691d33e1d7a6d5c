#![cfg(feature = "std")]

/// Prints a disassembly of one code section to stdout.
pub fn print(code: &[u8]) {
    use crate::{opcode::*, utils::read_i16};
    use alloy_primitives::hex;

    let mut i = 0;
    while i < code.len() {
        let op = code[i];
        let opcode = &OPCODE_INFO[op as usize];

        let Some(opcode) = opcode else {
            println!("Unknown opcode: 0x{:02X}", op);
            i += 1;
            continue;
        };

        if opcode.immediate_size() != 0 {
            // check if the opcode immediate are within the bounds of the code
            if i + opcode.immediate_size() as usize >= code.len() {
                println!("Malformed code: immediate out of bounds");
                break;
            }
        }

        print!("{}", opcode.name());
        if opcode.immediate_size() != 0 {
            let immediate = &code[i + 1..i + 1 + opcode.immediate_size() as usize];
            print!(" : 0x{:}", hex::encode(immediate));
            if opcode.immediate_size() == 2 {
                print!(" ({})", i16::from_be_bytes([immediate[0], immediate[1]]));
            }
        }
        println!();

        let mut jump_table_size = 0;
        if op == RJUMPV {
            let count = code[i + 1] as usize;
            jump_table_size = count * 2;

            // +1 is for the count byte
            if i + 1 + jump_table_size >= code.len() {
                println!("Malformed code: immediate out of bounds");
                break;
            }

            for entry in 0..count {
                let offset = read_i16(code, i + 2 + 2 * entry);
                println!("RJUMPV[{entry}]: 0x{offset:04X} ({offset})");
            }
        }

        i += 1 + opcode.immediate_size() as usize + jump_table_size;
    }
}

#[cfg(test)]
mod test {
    use alloy_primitives::hex;

    #[test]
    fn sanity_test() {
        super::print(&hex!("60015e01fffc00"));
        super::print(&hex!("b00001b1"));
    }
}

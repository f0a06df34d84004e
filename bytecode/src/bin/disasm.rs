use bytecode::BytecodeDecoder;
use std::env;
use std::fs;
use std::process::exit;

fn main() {
    let mut args = env::args().skip(1);
    let input = match args.next() {
        Some(v) => v,
        None => {
            eprintln!("usage: disasm <bytecode-file>");
            exit(2);
        }
    };
    if args.next().is_some() {
        eprintln!("usage: disasm <bytecode-file>");
        exit(2);
    }

    let bytes = match fs::read(&input) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("failed to read {}: {}", input, err);
            exit(1);
        }
    };

    let mut decoder = BytecodeDecoder::new(&bytes);
    while !decoder.is_at_end() {
        let offset = decoder.offset();
        match decoder.decode_next() {
            Some(instr) => println!("{:04}: {}", offset, instr),
            None => break,
        }
    }
}

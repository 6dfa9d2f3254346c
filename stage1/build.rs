use std::{env, fs::File, io::Write, path::Path};

const TARGET: &str = "mips-nintendo64-none";

/// Where IPL3 copies the first megabyte of ROM and jumps to.
const LOAD_ADDRESS: u32 = 0x8000_0400;
/// Top of the stock 4MB of RDRAM, minus a little headroom.
const STACK_TOP: u32 = 0x803F_FFF0;

fn generate_linkerscript() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let link_path = Path::new(&out_dir).join("linker.ld");
    let mut f = File::create(&link_path).expect("failed to create linker.ld");

    // 0x000-0x3FF belongs to the exception vectors and the boot handoff block
    const LINKER_BODY: &str = r#"
OUTPUT_FORMAT("elf32-bigmips")
ENTRY(_start)

SECTIONS {
  . = __load_address;

  .boot : { KEEP(*(.boot)) }
  .text : { *(.text*) }
  .rodata : ALIGN(8) { *(.rodata*) }
  .data : ALIGN(8) { *(.data*) *(.sdata*) }

  .bss (NOLOAD) : ALIGN(64) {
    __bss_start = .;
    *(.sbss*)
    *(.bss*)
    *(COMMON)
    . = ALIGN(8);
    __bss_end = .;
  }

  /DISCARD/ : { *(.MIPS.abiflags) *(.reginfo) *(.comment) }
}
"#;

    writeln!(f, "__load_address = 0x{:08X};", LOAD_ADDRESS).unwrap();
    writeln!(f, "__stack_top = 0x{:08X};", STACK_TOP).unwrap();
    f.write_all(LINKER_BODY.as_bytes()).unwrap();

    println!("cargo:rustc-link-arg=-T{}", link_path.display());
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Only run for the correct target
    let target = env::var("TARGET").unwrap();
    if target != TARGET {
        println!("cargo:warning=Not targeting {}; skipping linker script generation.", TARGET);
        return;
    }

    generate_linkerscript();
}

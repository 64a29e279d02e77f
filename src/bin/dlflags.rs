use bpaf::Bpaf;
use dlhandle::Mode;

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
/// Print the host loader's dlopen mode constants
struct Options {
    #[bpaf(long)]
    /// Print values in hexadecimal
    hex: bool,
}

fn main() {
    let options = options().run();

    for (name, mode) in Mode::NAMED {
        if options.hex {
            println!("{}: {:#07x}", name, mode.bits());
        } else {
            println!("{}: {}", name, mode.bits());
        }
    }
}

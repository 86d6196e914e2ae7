use tristar_core::core::machine::Machine;

/// Run `frame_count` frames of emulation with no host I/O: no input, no
/// video/audio presentation. Exists to give the headless binary a finite
/// termination condition in place of a GUI event loop.
pub fn run(machine: &mut dyn Machine, frame_count: u32) {
    let (width, height) = machine.display_size();
    let mut framebuffer = vec![0u8; (width * height * 3) as usize];
    let mut audio = vec![0i16; 1024];

    for _ in 0..frame_count {
        if !machine.is_ready() {
            eprintln!("Warning: machine is no longer ready, stopping early");
            break;
        }
        machine.run_frame();
        machine.render_frame(&mut framebuffer);
        machine.audio_callback(&mut audio);
    }
}

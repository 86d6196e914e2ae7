use crate::core::{Bus, BusMaster};
use crate::cpu::z80::{ExecState, Flag, Z80};

impl Z80 {
    // --- Accumulator rotates (4T, M1 only) ---

    /// RLCA — rotate A left circular. Bit 7 -> C and -> bit 0.
    pub fn op_rlca(&mut self) {
        let carry = (self.a & 0x80) != 0;
        self.a = self.a.rotate_left(1);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RRCA — rotate A right circular. Bit 0 -> C and -> bit 7.
    pub fn op_rrca(&mut self) {
        let carry = (self.a & 0x01) != 0;
        self.a = self.a.rotate_right(1);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RLA — rotate A left through carry.
    pub fn op_rla(&mut self) {
        let old_carry = (self.f & Flag::C as u8) != 0;
        let new_carry = (self.a & 0x80) != 0;
        self.a = (self.a << 1) | (old_carry as u8);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if new_carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RRA — rotate A right through carry.
    pub fn op_rra(&mut self) {
        let old_carry = (self.f & Flag::C as u8) != 0;
        let new_carry = (self.a & 0x01) != 0;
        self.a = (self.a >> 1) | ((old_carry as u8) << 7);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if new_carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// DAA — decimal-adjust A after a BCD ADD/SUB, per N/H/C.
    pub fn op_daa(&mut self) {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let h = (self.f & Flag::H as u8) != 0;
        let c = (self.f & Flag::C as u8) != 0;

        let mut correction: u8 = 0;
        let mut new_c = c;

        if h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if c || a > 0x99 {
            correction |= 0x60;
            new_c = true;
        }

        let result = if n { a.wrapping_sub(correction) } else { a.wrapping_add(correction) };

        let new_h = if n {
            h && (a & 0x0F) < 0x06
        } else {
            (a & 0x0F) + (correction & 0x0F) > 0x0F
        };

        let mut f = self.f & Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if new_h { f |= Flag::H as u8; }
        if new_c { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// CPL — complement A (bitwise NOT). Sets H, N; preserves S,Z,PV,C.
    pub fn op_cpl(&mut self) {
        self.a = !self.a;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// SCF — set carry flag. Clears H, N; preserves S,Z,PV.
    /// X/Y: per the documented undocumented rule, taken from A, OR'd with the
    /// previous flags' X/Y when the preceding instruction left Q clear.
    pub fn op_scf(&mut self) {
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        f |= Flag::C as u8;
        f |= self.xy_undocumented();
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// CCF — complement carry flag. Old C moves to H; N cleared.
    pub fn op_ccf(&mut self) {
        let old_c = (self.f & Flag::C as u8) != 0;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if old_c { f |= Flag::H as u8; } else { f &= !(Flag::H as u8); }
        if !old_c { f |= Flag::C as u8; }
        f |= self.xy_undocumented();
        self.f = f;
        self.state = ExecState::Fetch;
    }

    fn xy_undocumented(&self) -> u8 {
        let base = self.a & (Flag::X as u8 | Flag::Y as u8);
        if self.prev_q == 0 {
            base | (self.f & (Flag::X as u8 | Flag::Y as u8))
        } else {
            base
        }
    }

    /// NEG — A = 0 - A (ED prefix, 8T).
    pub fn op_neg(&mut self) {
        let a = self.a;
        let result = 0u8.wrapping_sub(a);

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0x0F) != 0 { f |= Flag::H as u8; }
        if a == 0x80 { f |= Flag::PV as u8; }
        if a != 0 { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RRD — rotate (HL) and A's low nibble right, through the digit chain
    /// A_lo -> (HL)_hi -> (HL)_lo -> A_lo. 18T: ED M1 + MR + 4 internal + MW.
    pub fn op_rrd<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        opcode: u8,
        cycle: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        match cycle {
            0 | 2 | 3 | 4 | 5 | 6 | 7 | 8 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            1 => {
                self.temp_data = bus.read(master, self.get_hl());
                self.state = ExecState::ExecuteED(opcode, 2);
            }
            9 => {
                let mem = self.temp_data;
                let a_lo = self.a & 0x0F;
                let new_mem = (a_lo << 4) | (mem >> 4);
                let new_a = (self.a & 0xF0) | (mem & 0x0F);
                bus.write(master, self.get_hl(), new_mem);
                self.memptr = self.get_hl().wrapping_add(1);
                self.update_rotate_digit_flags(new_a);
                self.state = ExecState::ExecuteED(opcode, 10);
            }
            10 => self.state = ExecState::Fetch,
            _ => unreachable!(),
        }
    }

    /// RLD — rotate (HL) and A's low nibble left, through the digit chain
    /// A_lo -> (HL)_lo -> (HL)_hi -> A_lo. 18T: ED M1 + MR + 4 internal + MW.
    pub fn op_rld<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        opcode: u8,
        cycle: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        match cycle {
            0 | 2 | 3 | 4 | 5 | 6 | 7 | 8 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            1 => {
                self.temp_data = bus.read(master, self.get_hl());
                self.state = ExecState::ExecuteED(opcode, 2);
            }
            9 => {
                let mem = self.temp_data;
                let a_lo = self.a & 0x0F;
                let new_mem = (mem << 4) | a_lo;
                let new_a = (self.a & 0xF0) | (mem >> 4);
                bus.write(master, self.get_hl(), new_mem);
                self.memptr = self.get_hl().wrapping_add(1);
                self.update_rotate_digit_flags(new_a);
                self.state = ExecState::ExecuteED(opcode, 10);
            }
            10 => self.state = ExecState::Fetch,
            _ => unreachable!(),
        }
    }

    fn update_rotate_digit_flags(&mut self, new_a: u8) {
        self.a = new_a;
        let mut f = self.f & Flag::C as u8;
        if new_a == 0 { f |= Flag::Z as u8; }
        if (new_a & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(new_a) { f |= Flag::PV as u8; }
        f |= new_a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }
}

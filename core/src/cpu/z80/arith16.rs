use crate::cpu::z80::{ExecState, Flag, Z80};

impl Z80 {
    /// ADD HL,rr — 11T: M1(4) + internal(7). Affects C, H, N only;
    /// S, Z, PV unaffected. X/Y taken from the high byte of the result.
    /// Opcode mask: 00 rr1 001 (rr: 0=BC, 1=DE, 2=HL/IX/IY, 3=SP)
    pub fn op_add_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let rp = (opcode >> 4) & 0x03;
        match cycle {
            1..=7 => self.state = ExecState::Execute(opcode, cycle + 1),
            8 => {
                let hl = self.get_rp(2);
                let operand = self.get_rp(rp);
                self.memptr = hl.wrapping_add(1);
                let result = hl as u32 + operand as u32;

                let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
                if ((hl & 0x0FFF) + (operand & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                let result16 = result as u16;
                f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

                self.set_rp(2, result16);
                self.f = f;
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }

    /// ADC HL,rr — 15T (ED prefix): full S/Z/H/PV/N/C flags, 16-bit add with carry.
    /// Opcode mask: 01 rr1 010
    pub fn op_adc_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let rp = (opcode >> 4) & 0x03;
        match cycle {
            0..=5 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            6 => {
                let hl = self.get_rp(2);
                let operand = self.get_rp(rp);
                self.memptr = hl.wrapping_add(1);
                let carry_in = if (self.f & Flag::C as u8) != 0 { 1u32 } else { 0 };
                let result = hl as u32 + operand as u32 + carry_in;
                let result16 = result as u16;

                let mut f = 0u8;
                if result16 == 0 { f |= Flag::Z as u8; }
                if (result16 & 0x8000) != 0 { f |= Flag::S as u8; }
                if ((hl & 0x0FFF) + (operand & 0x0FFF) + carry_in as u16) > 0x0FFF { f |= Flag::H as u8; }
                if (!(hl ^ operand) & (hl ^ result16) & 0x8000) != 0 { f |= Flag::PV as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

                self.set_rp(2, result16);
                self.f = f;
                self.state = ExecState::ExecuteED(opcode, 7);
            }
            7 => self.state = ExecState::Fetch,
            _ => unreachable!(),
        }
    }

    /// SBC HL,rr — 15T (ED prefix): full S/Z/H/PV/N/C flags, 16-bit subtract with borrow.
    /// Opcode mask: 01 rr0 010
    pub fn op_sbc_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let rp = (opcode >> 4) & 0x03;
        match cycle {
            0..=5 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            6 => {
                let hl = self.get_rp(2);
                let operand = self.get_rp(rp);
                self.memptr = hl.wrapping_add(1);
                let carry_in = if (self.f & Flag::C as u8) != 0 { 1i32 } else { 0 };
                let result = hl as i32 - operand as i32 - carry_in;
                let result16 = result as u16;

                let mut f = Flag::N as u8;
                if result16 == 0 { f |= Flag::Z as u8; }
                if (result16 & 0x8000) != 0 { f |= Flag::S as u8; }
                if ((hl & 0x0FFF) as i32) < ((operand & 0x0FFF) as i32 + carry_in) { f |= Flag::H as u8; }
                if ((hl ^ operand) & (hl ^ result16) & 0x8000) != 0 { f |= Flag::PV as u8; }
                if result < 0 { f |= Flag::C as u8; }
                f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);

                self.set_rp(2, result16);
                self.f = f;
                self.state = ExecState::ExecuteED(opcode, 7);
            }
            7 => self.state = ExecState::Fetch,
            _ => unreachable!(),
        }
    }

    /// INC/DEC rr — 6T: M1(4) + internal(2). No flags affected.
    /// Opcode mask: 00 rr0 011 (INC) / 00 rr1 011 (DEC)
    pub fn op_inc_dec_rr(&mut self, opcode: u8, cycle: u8) {
        let rp = (opcode >> 4) & 0x03;
        let is_dec = (opcode & 0x08) != 0;
        match cycle {
            1 => self.state = ExecState::Execute(opcode, 2),
            2 => self.state = ExecState::Execute(opcode, 3),
            3 => {
                let val = self.get_rp(rp);
                let result = if is_dec { val.wrapping_sub(1) } else { val.wrapping_add(1) };
                self.set_rp(rp, result);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }
}

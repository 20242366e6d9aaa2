mod support;

mod tests {
    use ws2812_gadget::{
        ArmError, Bit, BitPhase, BitWindow, EngineSlot, EngineState, Half, PulseTable,
        SessionState, Strip, TimingEngine,
    };

    use crate::support::{RecordingPin, decode_bits, expected_trace, lsb_bits, trace_until_idle};

    const TABLE: PulseTable = PulseTable::WS2812;
    const MAX_TICKS: usize = 10_000;

    #[test]
    fn test_idle_ticks_are_inert() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        let writes_after_init = engine.pin().writes.clone();

        for _ in 0..100 {
            engine.tick();
        }

        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.pin().writes, writes_after_init);
        assert_eq!(strip.session(), SessionState::Idle);
        assert_eq!(strip.frames_latched(), 0);
    }

    #[test]
    fn test_first_tick_after_arm_starts_first_bit() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        strip.arm(1, &[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(strip.session(), SessionState::Sending);

        engine.tick();

        assert_eq!(
            engine.state(),
            EngineState::Sending {
                phase: BitPhase::Sending(BitWindow {
                    index: 0,
                    bit: Bit::One,
                    half: Half::High,
                    pulse_ticks: 1,
                }),
                total_bits: 24,
            }
        );
        assert_eq!(engine.pin().writes.last(), Some(&true));
    }

    #[test]
    fn test_single_led_scenario() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        let bytes = [0x01, 0x02, 0x03];
        strip.arm(1, &bytes).unwrap();

        let trace = trace_until_idle(&mut engine, MAX_TICKS);

        assert_eq!(trace.len(), 24 * 10 + 40);
        assert_eq!(trace, expected_trace(&bytes, &TABLE));
        assert_eq!(strip.session(), SessionState::Idle);
        assert_eq!(strip.frames_latched(), 1);
    }

    #[test]
    fn test_buffer_fidelity() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        let bytes = [0xFF, 0x00, 0x80];
        strip.arm(1, &bytes).unwrap();

        let trace = trace_until_idle(&mut engine, MAX_TICKS);

        assert_eq!(decode_bits(&trace, &TABLE), lsb_bits(&bytes));
        // 0xFF first: LSB-first streaming starts with eight ones
        assert!(decode_bits(&trace, &TABLE)[..8].iter().all(|bit| *bit == Bit::One));
        // 0x80: only the last bit of the frame is set
        assert_eq!(decode_bits(&trace, &TABLE)[23], Bit::One);
        assert_eq!(decode_bits(&trace, &TABLE)[16], Bit::Zero);
    }

    #[test]
    fn test_duty_cycle_per_bit_value() {
        let strip: Strip<1> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        // 0b0000_0001: bit 0 is a one, bit 1 is a zero
        strip.arm(1, &[0x01, 0x00, 0x00]).unwrap();

        let trace = trace_until_idle(&mut engine, MAX_TICKS);

        let one = &trace[0..10];
        assert!(one[..7].iter().all(|level| *level == Some(true)));
        assert!(one[7..].iter().all(|level| *level == Some(false)));

        let zero = &trace[10..20];
        assert!(zero[..3].iter().all(|level| *level == Some(true)));
        assert!(zero[3..].iter().all(|level| *level == Some(false)));
    }

    #[test]
    fn test_every_window_is_ten_ticks() {
        let strip: Strip<8> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        let bytes: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(37)).collect();
        strip.arm(8, &bytes).unwrap();

        let trace = trace_until_idle(&mut engine, MAX_TICKS);

        assert_eq!(trace.len(), 8 * 24 * 10 + 40);
        let data = &trace[..8 * 24 * 10];
        for window in data.chunks(10) {
            // every window opens with a rising edge and closes low
            assert_eq!(window[0], Some(true));
            assert_eq!(window[9], Some(false));
            let high = window.iter().filter(|level| **level == Some(true)).count();
            assert!(high == 3 || high == 7, "high for {} ticks", high);
        }
    }

    #[test]
    fn test_reset_gap_holds_line_low() {
        let strip: Strip<1> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        strip.arm(1, &[0xFF, 0xFF, 0xFF]).unwrap();

        for _ in 0..240 {
            engine.tick();
        }
        assert_eq!(engine.state(), EngineState::ResetGap { elapsed: 0 });
        assert_eq!(strip.session(), SessionState::ResetGap);

        for tick in 1..40 {
            engine.tick();
            assert_eq!(engine.pin().writes.last(), Some(&false));
            assert_eq!(engine.state(), EngineState::ResetGap { elapsed: tick });
            assert_eq!(strip.frames_latched(), 0);
        }

        engine.tick();
        assert_eq!(engine.pin().writes.last(), Some(&false));
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(strip.session(), SessionState::Idle);
        assert_eq!(strip.frames_latched(), 1);
    }

    #[test]
    fn test_zero_leds_skips_data() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        strip.arm(0, &[]).unwrap();

        engine.tick();
        assert_eq!(engine.state(), EngineState::ResetGap { elapsed: 0 });
        assert_eq!(engine.pin().writes, vec![false]);

        let mut trace = vec![None];
        trace.extend(trace_until_idle(&mut engine, MAX_TICKS));
        assert_eq!(trace, expected_trace(&[], &TABLE));
        assert!(!engine.pin().writes.contains(&true));
        assert_eq!(strip.frames_latched(), 1);
    }

    #[test]
    fn test_arm_while_busy_is_rejected() {
        let strip: Strip<4> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());
        strip.arm(1, &[0x00, 0x00, 0x00]).unwrap();

        assert_eq!(strip.arm(1, &[0xFF, 0xFF, 0xFF]), Err(ArmError::Busy));

        for _ in 0..245 {
            engine.tick();
        }
        assert_eq!(strip.session(), SessionState::ResetGap);
        assert_eq!(strip.arm(1, &[0xFF, 0xFF, 0xFF]), Err(ArmError::Busy));

        // the rejected payload never reached the line
        let trace = trace_until_idle(&mut engine, MAX_TICKS);
        assert!(trace.iter().all(|level| *level == Some(false)));
        assert!(strip.arm(1, &[0xFF, 0xFF, 0xFF]).is_ok());
    }

    #[test]
    fn test_engine_is_reused_across_frames() {
        let strip: Strip<2> = Strip::new();
        let mut engine = TimingEngine::new(&strip, RecordingPin::default());

        strip.arm(1, &[0xAA, 0x55, 0x0F]).unwrap();
        let first = trace_until_idle(&mut engine, MAX_TICKS);
        assert_eq!(first, expected_trace(&[0xAA, 0x55, 0x0F], &TABLE));

        strip.arm(2, &[1, 2, 3, 4, 5, 6]).unwrap();
        let second = trace_until_idle(&mut engine, MAX_TICKS);
        assert_eq!(second, expected_trace(&[1, 2, 3, 4, 5, 6], &TABLE));

        assert_eq!(strip.frames_latched(), 2);
    }

    #[test]
    fn test_custom_pulse_table() {
        let table = PulseTable {
            zero_high: 1,
            zero_low: 2,
            one_high: 2,
            one_low: 1,
            reset: 5,
        };
        let strip: Strip<1> = Strip::new();
        let mut engine = TimingEngine::with_table(&strip, RecordingPin::default(), table);
        strip.arm(1, &[0x0F, 0xF0, 0x3C]).unwrap();

        let trace = trace_until_idle(&mut engine, MAX_TICKS);

        assert_eq!(trace.len(), 24 * 3 + 5);
        assert_eq!(trace, expected_trace(&[0x0F, 0xF0, 0x3C], &table));
    }

    #[test]
    fn test_engine_slot_drives_installed_engine() {
        let strip: Strip<1> = Strip::new();
        let slot: EngineSlot<TimingEngine<'_, RecordingPin, 1>> = EngineSlot::new();

        // ticks before install are dropped
        slot.tick();

        assert!(slot.install(TimingEngine::new(&strip, RecordingPin::default())).is_none());
        strip.arm(1, &[0x00, 0x00, 0x00]).unwrap();
        for _ in 0..280 {
            slot.tick();
        }

        assert_eq!(strip.session(), SessionState::Idle);
        assert_eq!(strip.frames_latched(), 1);
        let engine = slot.take().unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(slot.take().is_none());
    }
}

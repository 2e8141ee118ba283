use crate::models::SlotTime;

/// The fixed shape of one clinic day. Changing business hours means changing
/// only these block descriptors; everything downstream derives from them.
const SLOT_LENGTH_MINUTES: i32 = 15;

/// (first slot start, number of consecutive slots) per block. The midday gap
/// between the blocks is never offered.
const DAILY_BLOCKS: [(i32, i32); 2] = [
    (8 * 60, 5),  // 08:00 .. 09:15
    (13 * 60, 5), // 13:00 .. 14:15
];

/// The ordered set of (start, end) windows a clinic day offers for every
/// doctor. Pure and deterministic; the seeder multiplies this template over
/// doctors and horizon days.
pub fn daily_template() -> Vec<SlotTime> {
    let mut template = Vec::new();

    for (block_start, slot_count) in DAILY_BLOCKS {
        for index in 0..slot_count {
            let start_minutes = block_start + index * SLOT_LENGTH_MINUTES;
            template.push(SlotTime {
                start_minutes,
                end_minutes: start_minutes + SLOT_LENGTH_MINUTES,
            });
        }
    }

    template
}

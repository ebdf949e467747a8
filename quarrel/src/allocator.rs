/*!
Distribution of a run of positional tokens over the unsatisfied positional
slots. This is a pure counting function: it decides how many tokens each slot
receives and leaves the tokens themselves to the caller.

The scan is a single forward pass without backtracking:

1. Walk the slots left to right, accumulating `min_args` (the sum of minimums),
   `one_args` (the sum of `ZeroOrOne` capacities) and `more_args` (whether any
   slot is unbounded). The window closes before the first slot whose minimum
   wouldn't fit in the run, before a `Remainder` slot that isn't the first
   slot, and right after a sub-command slot or a leading `Remainder`.
2. If the run is exactly `min_args` long, every slot gets its minimum.
3. Otherwise, if the window has an unbounded slot, the whole surplus goes to
   the first one.
4. Otherwise, if the `ZeroOrOne` slots can absorb the surplus, or the window
   was closed by a sub-command or `Remainder` slot, they're filled left to
   right, each up to its capacity.
5. Otherwise every slot gets its minimum and the tail of the run is left over.

Step 3 is checked before step 4 even when both could apply.
*/

use crate::argument::Nargs;

/// How a single slot consumes tokens, as far as allocation is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPolicy {
    /// A positional argument with a resolved policy
    Nargs(Nargs),

    /// The sub-command slot: takes exactly the name token, and everything
    /// after the name belongs to the sub-command
    Command,
}

impl SlotPolicy {
    fn minimum(self) -> usize {
        match self {
            SlotPolicy::Nargs(nargs) => nargs.minimum(),
            SlotPolicy::Command => 1,
        }
    }

    fn is_unbounded(self) -> bool {
        matches!(
            self,
            SlotPolicy::Nargs(Nargs::OneOrMore(_) | Nargs::ZeroOrMore(_) | Nargs::Remainder)
        )
    }

    fn optional_capacity(self) -> usize {
        match self {
            SlotPolicy::Nargs(Nargs::ZeroOrOne(n)) => n,
            _ => 0,
        }
    }
}

/// Why the allocation window stopped growing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    /// Every slot was examined
    Exhausted,

    /// The next slot's minimum didn't fit in the run
    Budget,

    /// The next slot is a `Remainder` that will take the rest of the input
    Remainder,

    /// The window ends with the sub-command slot
    Command,
}

impl Closure {
    /// True if tokens left over after this window can never be claimed by a
    /// positional of this run. Otherwise, they belong to the slot that closed
    /// the window.
    #[must_use]
    pub fn strands_leftovers(self) -> bool {
        matches!(self, Closure::Exhausted | Closure::Budget)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Token counts for the slots of the window, in order. Slots after the
    /// window aren't listed.
    pub counts: Vec<usize>,

    /// Tokens at the tail of the run that no slot of the window claimed
    pub leftover: usize,

    pub closed_by: Closure,
}

/// Distribute `run_len` tokens over `slots`. See the [module docs][self].
#[must_use]
pub fn allocate(run_len: usize, slots: &[SlotPolicy]) -> Allocation {
    let mut min_args = 0;
    let mut one_args = 0;
    let mut more_args = false;
    let mut window = 0;
    let mut closed_by = Closure::Exhausted;

    for (i, &slot) in slots.iter().enumerate() {
        if i > 0 && slot == SlotPolicy::Nargs(Nargs::Remainder) {
            closed_by = Closure::Remainder;
            break;
        }

        let minimum = slot.minimum();
        if min_args + minimum > run_len {
            closed_by = Closure::Budget;
            break;
        }

        min_args += minimum;
        one_args += slot.optional_capacity();
        more_args |= slot.is_unbounded();
        window = i + 1;

        match slot {
            SlotPolicy::Command => {
                closed_by = Closure::Command;
                break;
            }
            SlotPolicy::Nargs(Nargs::Remainder) => {
                closed_by = Closure::Remainder;
                break;
            }
            SlotPolicy::Nargs(_) => {}
        }
    }

    let slots = &slots[..window];
    let mut counts: Vec<usize> = slots.iter().map(|slot| slot.minimum()).collect();
    let mut surplus = run_len - min_args;

    if surplus == 0 {
        // Every slot gets exactly its minimum
    } else if more_args {
        if let Some(i) = slots.iter().position(|slot| slot.is_unbounded()) {
            counts[i] += surplus;
            surplus = 0;
        }
    } else if min_args + one_args >= run_len
        || matches!(closed_by, Closure::Command | Closure::Remainder)
    {
        // Before a sub-command or a remainder, whatever the optional slots
        // can't take belongs to the slot that closed the window
        for (count, slot) in counts.iter_mut().zip(slots) {
            let take = slot.optional_capacity().min(surplus);
            *count += take;
            surplus -= take;
        }
    }

    Allocation {
        counts,
        leftover: surplus,
        closed_by,
    }
}

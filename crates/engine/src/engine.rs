// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rule engine: an ordered rule list plus one persistent [`MachineMemory`]
//! (§4.3). `evaluate` is the entire scan: clear `active_rule_names`, walk
//! rules in order, log-and-continue on error.
//!
//! Rules are registered in the order the feeder rule set builds them, and
//! that order is load-bearing: later rules observe writes from earlier
//! ones in the same scan, so safety rules are registered last to
//! dominate (I4, P5).

use crate::event_log::EventLog;
use crate::facade::IoFacade;
use crate::mem::MachineMemory;
use crate::rule::{Controller, Rule, RuleStatus};

pub struct Engine {
    rules: Vec<Rule>,
    memory: MachineMemory,
    active_rule_names: Vec<&'static str>,
}

impl Engine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules, memory: MachineMemory::new(), active_rule_names: Vec::new() }
    }

    pub fn memory(&self) -> &MachineMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MachineMemory {
        &mut self.memory
    }

    /// Names of rules whose condition was true in the most recent scan
    /// (I3: cleared at the start of every scan, memory is not).
    pub fn active_rule_names(&self) -> &[&'static str] {
        &self.active_rule_names
    }

    pub fn enable(&mut self, name: &str) {
        if let Some(rule) = self.find_mut(name) {
            rule.enabled = true;
        }
    }

    pub fn disable(&mut self, name: &str) {
        if let Some(rule) = self.find_mut(name) {
            rule.enabled = false;
        }
    }

    pub fn rule_status(&self) -> Vec<RuleStatus> {
        self.rules.iter().map(Rule::status).collect()
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|rule| rule.name == name)
    }

    /// One scan (§4.3): evaluate every enabled rule's condition in order,
    /// running its action and bumping its bookkeeping on a hit. A
    /// condition or action that returns `Err` is logged at ERROR and the
    /// scan moves on to the next rule — a rule must never take down the
    /// loop (§7).
    pub fn evaluate(&mut self, io: &mut IoFacade, log: &EventLog, now: f64) {
        self.active_rule_names.clear();
        for rule in &mut self.rules {
            if !rule.enabled {
                continue;
            }
            match (rule.condition)(io, &self.memory, now) {
                Ok(true) => {
                    self.active_rule_names.push(rule.name);
                    rule.last_triggered_at = Some(now);
                    rule.trigger_count += 1;
                    let ctl = Controller { log, now };
                    if let Err(e) = (rule.action)(io, &mut self.memory, &ctl) {
                        log.error(format!("rule '{}' action failed: {e}", rule.name), now);
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    log.error(format!("rule '{}' condition failed: {e}", rule.name), now);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

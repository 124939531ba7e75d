//! Declarative document grammar engine.
//!
//! A grammar is a list of [`DocumentType`]s. Each document type splits the
//! document lines into [`Block`]s, and each block runs a [`Recipe`]: an
//! ordered list of [`Section`]s that pull named values out of consecutive
//! lines and write them into a [`Draft`].
//!
//! ```text
//! DocumentType ──► Block (start/end lines) ──► Recipe
//!                                               ├─ Section  (patterns → values → assign)
//!                                               ├─ one_of   (first matching alternative)
//!                                               ├─ conclude (post-processing)
//!                                               └─ wrap     (Draft → Item)
//! ```

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use regex::Regex;

use super::extractor_utils::{self, NumberFormat};
use crate::currency::ExchangeRate;
use crate::error::{ExtractionError, FieldError, GrammarError, MoneyError};
use crate::models::{
    new_uuid, AccountEntry, AccountTransferEntry, BuySellEntry, Item, ItemKind, PortfolioEntry,
    PortfolioTransferEntry, SecurityDraft,
};
use crate::pp::{
    AccountTransaction, AccountTransactionType, Money, PortfolioTransaction, PortfolioTransactionType,
    TransactionUnit, UnitType,
};

// =============================================================================
// Draft
// =============================================================================

/// What a recipe produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    BuySell(PortfolioTransactionType),
    Account(AccountTransactionType),
    Portfolio(PortfolioTransactionType),
    AccountTransfer,
    PortfolioTransfer,
}

/// Mutable transaction under construction.
///
/// Units always belong to the primary leg: the portfolio leg of a buy/sell
/// and the source leg of a transfer.
#[derive(Debug, Clone)]
pub struct Draft {
    pub kind: DraftKind,
    pub date: Option<NaiveDateTime>,
    pub amount: Option<Money>,
    /// Credited amount of an account transfer, defaults to `amount`
    pub target_amount: Option<Money>,
    pub shares: Option<i64>,
    pub security: Option<SecurityDraft>,
    pub units: Vec<TransactionUnit>,
    pub note: Option<String>,
    pub failure: Option<String>,
}

impl Draft {
    pub fn new(kind: DraftKind) -> Self {
        Self {
            kind,
            date: None,
            amount: None,
            target_amount: None,
            shares: None,
            security: None,
            units: Vec::new(),
            note: None,
            failure: None,
        }
    }

    pub fn buy_sell(tx_type: PortfolioTransactionType) -> Self {
        Self::new(DraftKind::BuySell(tx_type))
    }

    pub fn account(tx_type: AccountTransactionType) -> Self {
        Self::new(DraftKind::Account(tx_type))
    }

    pub fn portfolio(tx_type: PortfolioTransactionType) -> Self {
        Self::new(DraftKind::Portfolio(tx_type))
    }

    pub fn currency(&self) -> Option<&str> {
        self.amount.as_ref().map(|m| m.currency.as_str())
    }

    pub fn security_currency(&self) -> Option<&str> {
        self.security.as_ref().map(|s| s.currency.as_str())
    }

    /// Security of the draft, created on first access
    pub fn security_mut(&mut self) -> &mut SecurityDraft {
        self.security.get_or_insert_with(SecurityDraft::default)
    }

    /// Same polarity as the primary leg's [`crate::pp::Transaction::deducts_costs`]
    pub fn deducts_costs(&self) -> bool {
        match self.kind {
            DraftKind::BuySell(t) | DraftKind::Portfolio(t) => !t.is_purchase(),
            DraftKind::Account(t) => t.is_credit(),
            DraftKind::AccountTransfer => AccountTransactionType::TransferOut.is_credit(),
            DraftKind::PortfolioTransfer => !PortfolioTransactionType::TransferOut.is_purchase(),
        }
    }

    pub fn unit(&self, unit_type: UnitType) -> Option<&TransactionUnit> {
        self.units.iter().find(|u| u.unit_type == unit_type)
    }

    pub fn add_unit(&mut self, unit: TransactionUnit) {
        self.units.push(unit);
    }

    pub fn remove_units(&mut self, unit_type: UnitType) {
        self.units.retain(|u| u.unit_type != unit_type);
    }

    /// Gross value derived from amount, fees and taxes
    pub fn gross_value(&self) -> Result<Option<Money>, MoneyError> {
        let Some(amount) = &self.amount else {
            return Ok(None);
        };
        let costs = self
            .units
            .iter()
            .filter(|u| u.unit_type != UnitType::GrossValue)
            .try_fold(Money::zero(amount.currency.clone()), |acc, u| acc.add(&u.amount))?;
        let gross = if self.deducts_costs() {
            amount.add(&costs)?
        } else {
            amount.subtract(&costs)?
        };
        Ok(Some(gross))
    }

    /// Turn the draft into an item payload. Date and amount are always
    /// required; security kinds also need a security and shares.
    pub fn build(self) -> Result<ItemKind, FieldError> {
        let date = self.date.ok_or_else(|| FieldError::Missing("date".into()))?;
        let amount = self.amount.ok_or_else(|| FieldError::Missing("amount".into()))?;

        let kind = match self.kind {
            DraftKind::BuySell(tx_type) => {
                let security = self.security.ok_or_else(|| FieldError::Missing("security".into()))?;
                let shares = self.shares.ok_or_else(|| FieldError::Missing("shares".into()))?;
                let mut entry = BuySellEntry::new(tx_type, date, amount, shares, security);
                entry.portfolio_transaction.units = self.units;
                entry.portfolio_transaction.note = self.note.clone();
                entry.account_transaction.note = self.note;
                ItemKind::BuySell(entry)
            }
            DraftKind::Account(tx_type) => {
                let mut transaction = AccountTransaction::new(new_uuid(), date, tx_type, amount);
                transaction.shares = self.shares;
                transaction.units = self.units;
                transaction.note = self.note;
                ItemKind::AccountTransaction(AccountEntry {
                    transaction,
                    security: self.security,
                })
            }
            DraftKind::Portfolio(tx_type) => {
                let security = self.security.ok_or_else(|| FieldError::Missing("security".into()))?;
                let shares = self.shares.ok_or_else(|| FieldError::Missing("shares".into()))?;
                let mut transaction = PortfolioTransaction::new(new_uuid(), date, tx_type, amount, shares);
                transaction.units = self.units;
                transaction.note = self.note;
                ItemKind::PortfolioTransaction(PortfolioEntry { transaction, security })
            }
            DraftKind::AccountTransfer => {
                let target_amount = self.target_amount.unwrap_or_else(|| amount.clone());
                let mut entry = AccountTransferEntry::new(date, amount, target_amount);
                entry.source.units = self.units;
                entry.source.note = self.note.clone();
                entry.target.note = self.note;
                ItemKind::AccountTransfer(entry)
            }
            DraftKind::PortfolioTransfer => {
                let security = self.security.ok_or_else(|| FieldError::Missing("security".into()))?;
                let shares = self.shares.ok_or_else(|| FieldError::Missing("shares".into()))?;
                let mut entry = PortfolioTransferEntry::new(date, amount, shares, security);
                entry.source.units = self.units;
                entry.source.note = self.note.clone();
                entry.target.note = self.note;
                ItemKind::PortfolioTransfer(entry)
            }
        };
        Ok(kind)
    }
}

// =============================================================================
// Parsed values and block context
// =============================================================================

/// Values captured by one section match, with the grammar's number and date
/// conventions for typed access.
#[derive(Debug, Clone)]
pub struct ParsedData<'a> {
    values: HashMap<String, String>,
    format: NumberFormat,
    date_formats: &'a [&'a str],
}

impl<'a> ParsedData<'a> {
    pub fn new(values: HashMap<String, String>, format: NumberFormat, date_formats: &'a [&'a str]) -> Self {
        Self {
            values,
            format,
            date_formats,
        }
    }

    pub fn get(&self, key: &str) -> Result<&str, FieldError> {
        self.get_opt(key).ok_or_else(|| FieldError::Missing(key.to_string()))
    }

    pub fn get_opt(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// ISO currency code from `key`
    pub fn currency(&self, key: &str) -> Result<String, FieldError> {
        extractor_utils::as_currency_code(key, self.get(key)?)
    }

    /// Money from a currency attribute and an amount attribute
    pub fn money(&self, currency_key: &str, amount_key: &str) -> Result<Money, FieldError> {
        let currency = self.currency(currency_key)?;
        self.format.as_amount(amount_key, self.get(amount_key)?, &currency)
    }

    /// Money in a currency known from elsewhere
    pub fn amount_in(&self, amount_key: &str, currency: &str) -> Result<Money, FieldError> {
        self.format.as_amount(amount_key, self.get(amount_key)?, currency)
    }

    pub fn shares(&self, key: &str) -> Result<i64, FieldError> {
        self.format.as_shares(key, self.get(key)?)
    }

    pub fn exchange_rate(&self, key: &str) -> Result<rust_decimal::Decimal, FieldError> {
        self.format.as_exchange_rate(key, self.get(key)?)
    }

    pub fn date(&self, key: &str) -> Result<NaiveDateTime, FieldError> {
        extractor_utils::as_date(key, self.get(key)?, self.date_formats)
    }

    pub fn date_time(&self, date_key: &str, time_key: &str) -> Result<NaiveDateTime, FieldError> {
        extractor_utils::as_date_time(date_key, self.get(date_key)?, self.get(time_key)?, self.date_formats)
    }
}

/// Values shared between the sections of one block: the document context
/// plus whatever earlier sections put there.
#[derive(Debug, Clone, Default)]
pub struct BlockContext {
    values: HashMap<String, String>,
    /// Rate printed in the block, used to convert fees, taxes and gross value
    pub exchange_rate: Option<ExchangeRate>,
}

impl BlockContext {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

// =============================================================================
// Section
// =============================================================================

type AssignFn = Box<dyn Fn(&mut Draft, &ParsedData, &mut BlockContext) -> Result<(), FieldError> + Send + Sync>;
type ConcludeFn = Box<dyn Fn(&mut Draft, &BlockContext) -> Result<(), FieldError> + Send + Sync>;
type WrapFn = Box<dyn Fn(&Draft) -> bool + Send + Sync>;

/// Lines matched in order, each capturing some of the section's attributes.
pub struct Section {
    id: Option<String>,
    attributes: Vec<String>,
    patterns: Vec<Regex>,
    document_context: Vec<String>,
    optional: bool,
    multiple: bool,
    assign: Option<AssignFn>,
    errors: Vec<GrammarError>,
}

impl Section {
    pub fn new(attributes: &[&str]) -> Self {
        Self {
            id: None,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            patterns: Vec::new(),
            document_context: Vec::new(),
            optional: false,
            multiple: false,
            assign: None,
            errors: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Next line that contains a match for `pattern`
    pub fn find(self, pattern: &str) -> Self {
        self.pattern(pattern.to_string())
    }

    /// Next line that matches `pattern` as a whole
    pub fn match_line(self, pattern: &str) -> Self {
        self.pattern(format!("^(?:{})$", pattern))
    }

    fn pattern(mut self, pattern: String) -> Self {
        match compile(&pattern) {
            Ok(regex) => self.patterns.push(regex),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Attributes copied from the document context when the section matches
    pub fn document_context(mut self, keys: &[&str]) -> Self {
        self.document_context.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Keep matching after the first hit, running `assign` for every match
    pub fn multiple_times(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn assign<F>(mut self, assign: F) -> Self
    where
        F: Fn(&mut Draft, &ParsedData, &mut BlockContext) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        self.assign = Some(Box::new(assign));
        self
    }

    fn label(&self) -> String {
        match (&self.id, self.patterns.first()) {
            (Some(id), _) => id.clone(),
            (None, Some(p)) => p.as_str().to_string(),
            (None, None) => self.attributes.join(","),
        }
    }

    fn validate(&self, ids: &mut HashSet<String>) -> Result<(), GrammarError> {
        if let Some(e) = self.errors.first() {
            return Err(e.clone());
        }
        if self.patterns.is_empty() {
            return Err(GrammarError::EmptySection(self.label()));
        }
        if let Some(id) = &self.id {
            if !ids.insert(id.clone()) {
                return Err(GrammarError::DuplicateSectionId(id.clone()));
            }
        }
        Ok(())
    }

    /// Run the patterns over `lines[start..=end]` and hand every complete
    /// match to `on_match`. Returns whether any match completed.
    fn scan<F>(&self, lines: &[&str], start: usize, end: usize, ctx: &BlockContext, mut on_match: F) -> Result<bool, FieldError>
    where
        F: FnMut(HashMap<String, String>) -> Result<(), FieldError>,
    {
        let mut matched = false;
        let mut pattern_no = 0;
        let mut values = HashMap::new();

        for line in lines.iter().take(end + 1).skip(start) {
            let Some(caps) = self.patterns[pattern_no].captures(line) else {
                continue;
            };
            for attribute in &self.attributes {
                if let Some(m) = caps.name(attribute) {
                    values.insert(attribute.clone(), m.as_str().trim().to_string());
                }
            }

            pattern_no += 1;
            if pattern_no < self.patterns.len() {
                continue;
            }

            for key in &self.document_context {
                let value = ctx.get(key).ok_or_else(|| FieldError::Missing(key.clone()))?;
                values.insert(key.clone(), value.to_string());
            }
            if let Some(missing) = self.attributes.iter().find(|a| !values.contains_key(*a)) {
                return Err(FieldError::Missing(missing.clone()));
            }

            on_match(std::mem::take(&mut values))?;
            matched = true;

            if !self.multiple {
                break;
            }
            pattern_no = 0;
        }

        Ok(matched)
    }

    fn parse(
        &self,
        lines: &[&str],
        range: (usize, usize),
        draft: &mut Draft,
        ctx: &mut BlockContext,
        format: NumberFormat,
        date_formats: &[&str],
    ) -> Result<bool, FieldError> {
        let snapshot = ctx.clone();
        let matched = self.scan(lines, range.0, range.1, &snapshot, |values| {
            let data = ParsedData::new(values, format, date_formats);
            match &self.assign {
                Some(assign) => assign(&mut *draft, &data, &mut *ctx),
                None => Ok(()),
            }
        })?;

        if !matched && !self.optional {
            return Err(FieldError::Unmatched(self.label()));
        }
        Ok(matched)
    }
}

// =============================================================================
// Recipe
// =============================================================================

enum Step {
    Section(Section),
    OneOf { alternatives: Vec<Section>, optional: bool },
}

/// How one block becomes an item
pub struct Recipe {
    factory: Box<dyn Fn() -> Draft + Send + Sync>,
    steps: Vec<Step>,
    concludes: Vec<ConcludeFn>,
    wrap_if: Option<WrapFn>,
}

impl Recipe {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Draft + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            steps: Vec::new(),
            concludes: Vec::new(),
            wrap_if: None,
        }
    }

    pub fn section(mut self, section: Section) -> Self {
        self.steps.push(Step::Section(section));
        self
    }

    /// The first alternative that matches wins; none matching fails the block
    pub fn one_of(mut self, alternatives: Vec<Section>) -> Self {
        self.steps.push(Step::OneOf {
            alternatives,
            optional: false,
        });
        self
    }

    pub fn optional_one_of(mut self, alternatives: Vec<Section>) -> Self {
        self.steps.push(Step::OneOf {
            alternatives,
            optional: true,
        });
        self
    }

    /// Post-processing after all sections ran
    pub fn conclude<F>(mut self, conclude: F) -> Self
    where
        F: Fn(&mut Draft, &BlockContext) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        self.concludes.push(Box::new(conclude));
        self
    }

    /// Drop the block without error unless `predicate` holds
    pub fn wrap_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Draft) -> bool + Send + Sync + 'static,
    {
        self.wrap_if = Some(Box::new(predicate));
        self
    }

    fn sections(&self) -> impl Iterator<Item = &Section> {
        self.steps.iter().flat_map(|step| match step {
            Step::Section(s) => std::slice::from_ref(s).iter(),
            Step::OneOf { alternatives, .. } => alternatives.iter(),
        })
    }

    fn parse(
        &self,
        source: &str,
        lines: &[&str],
        range: (usize, usize),
        document_context: &BlockContext,
        format: NumberFormat,
        date_formats: &[&str],
    ) -> Result<Option<Item>, FieldError> {
        let mut draft = (self.factory)();
        let mut ctx = document_context.clone();

        for step in &self.steps {
            match step {
                Step::Section(section) => {
                    section.parse(lines, range, &mut draft, &mut ctx, format, date_formats)?;
                }
                Step::OneOf { alternatives, optional } => {
                    let mut reasons = Vec::new();
                    let mut found = false;
                    for alternative in alternatives {
                        // Alternatives run on copies so a failed attempt leaves no trace
                        let mut attempt = draft.clone();
                        let mut attempt_ctx = ctx.clone();
                        match alternative.parse(lines, range, &mut attempt, &mut attempt_ctx, format, date_formats) {
                            Ok(true) => {
                                draft = attempt;
                                ctx = attempt_ctx;
                                found = true;
                                break;
                            }
                            Ok(false) => reasons.push(FieldError::Unmatched(alternative.label()).to_string()),
                            Err(e) => reasons.push(e.to_string()),
                        }
                    }
                    if !found && !optional {
                        return Err(FieldError::Unmatched(reasons.join(" | ")));
                    }
                }
            }
        }

        for conclude in &self.concludes {
            conclude(&mut draft, &ctx)?;
        }

        if let Some(predicate) = &self.wrap_if {
            if !predicate(&draft) {
                return Ok(None);
            }
        }

        let failure = draft.failure.take();
        let mut item = Item::new(draft.build()?, source);
        item.failure = failure;
        Ok(Some(item))
    }
}

// =============================================================================
// Block
// =============================================================================

/// Line range of a document handled by one recipe
pub struct Block {
    starts_with: Option<Regex>,
    ends_with: Option<Regex>,
    max_size: Option<usize>,
    recipe: Option<Recipe>,
    errors: Vec<GrammarError>,
}

impl Block {
    /// A block starts at every line that matches `start` as a whole
    pub fn new(start: &str) -> Self {
        let mut block = Self {
            starts_with: None,
            ends_with: None,
            max_size: None,
            recipe: None,
            errors: Vec::new(),
        };
        match compile(&format!("^(?:{})$", start)) {
            Ok(regex) => block.starts_with = Some(regex),
            Err(e) => block.errors.push(e),
        }
        block
    }

    /// End at the first line matching `end` as a whole. Blocks without such
    /// a line are skipped.
    pub fn end(mut self, end: &str) -> Self {
        match compile(&format!("^(?:{})$", end)) {
            Ok(regex) => self.ends_with = Some(regex),
            Err(e) => self.errors.push(e),
        }
        self
    }

    pub fn max_size(mut self, lines: usize) -> Self {
        self.max_size = Some(lines);
        self
    }

    pub fn recipe(mut self, recipe: Recipe) -> Self {
        self.recipe = Some(recipe);
        self
    }

    /// Inclusive line ranges of all blocks in `lines`
    pub fn ranges(&self, lines: &[&str]) -> Vec<(usize, usize)> {
        let Some(starts_with) = &self.starts_with else {
            return Vec::new();
        };
        let starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| starts_with.is_match(line))
            .map(|(i, _)| i)
            .collect();

        let mut ranges = Vec::with_capacity(starts.len());
        for (n, &start) in starts.iter().enumerate() {
            let mut end = match starts.get(n + 1) {
                Some(next) => next - 1,
                None => lines.len() - 1,
            };
            if let Some(ends_with) = &self.ends_with {
                match (start..lines.len()).find(|&i| ends_with.is_match(lines[i])) {
                    Some(found) => end = found,
                    None => continue,
                }
            }
            if let Some(max) = self.max_size {
                end = end.min(start + max.max(1) - 1);
            }
            ranges.push((start, end));
        }
        ranges
    }

    fn validate(&self, ids: &mut HashSet<String>) -> Result<(), GrammarError> {
        if let Some(e) = self.errors.first() {
            return Err(e.clone());
        }
        if let Some(recipe) = &self.recipe {
            for section in recipe.sections() {
                section.validate(ids)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Document type
// =============================================================================

/// One kind of document a grammar understands (contract note, dividend
/// advice, account statement).
pub struct DocumentType {
    must_include: Vec<Regex>,
    must_not_include: Vec<Regex>,
    context_sections: Vec<Section>,
    blocks: Vec<Block>,
    errors: Vec<GrammarError>,
}

impl DocumentType {
    /// Applies to documents with a line containing `must_include`
    pub fn new(must_include: &str) -> Self {
        Self {
            must_include: Vec::new(),
            must_not_include: Vec::new(),
            context_sections: Vec::new(),
            blocks: Vec::new(),
            errors: Vec::new(),
        }
        .must_include(must_include)
    }

    pub fn must_include(mut self, pattern: &str) -> Self {
        match compile(pattern) {
            Ok(regex) => self.must_include.push(regex),
            Err(e) => self.errors.push(e),
        }
        self
    }

    pub fn must_not_include(mut self, pattern: &str) -> Self {
        match compile(pattern) {
            Ok(regex) => self.must_not_include.push(regex),
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Values collected once per document and visible to every block.
    /// Each attribute of the first match is stored under its own name.
    pub fn context(mut self, section: Section) -> Self {
        self.context_sections.push(section);
        self
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn validate(&self) -> Result<(), GrammarError> {
        if let Some(e) = self.errors.first() {
            return Err(e.clone());
        }
        let mut ids = HashSet::new();
        for section in &self.context_sections {
            section.validate(&mut ids)?;
        }
        for block in &self.blocks {
            block.validate(&mut ids)?;
        }
        Ok(())
    }

    pub fn matches(&self, lines: &[&str]) -> bool {
        let contains = |p: &Regex| lines.iter().any(|l| p.is_match(l));
        self.must_include.iter().all(contains) && !self.must_not_include.iter().any(contains)
    }

    fn document_context(&self, lines: &[&str]) -> BlockContext {
        let mut ctx = BlockContext::default();
        if lines.is_empty() {
            return ctx;
        }
        for section in &self.context_sections {
            let mut collected = HashMap::new();
            // A context section that does not match leaves its keys unset
            let outcome = section.scan(lines, 0, lines.len() - 1, &BlockContext::default(), |values| {
                collected.extend(values);
                Ok(())
            });
            if let Err(e) = outcome {
                log::debug!("Context section {} skipped: {}", section.label(), e);
            }
            for (key, value) in collected {
                ctx.put(key, value);
            }
        }
        ctx
    }

    /// Extract every block of the document. Failing blocks become errors;
    /// the remaining blocks are unaffected.
    pub fn parse(
        &self,
        source: &str,
        lines: &[&str],
        format: NumberFormat,
        date_formats: &[&str],
    ) -> (Vec<Item>, Vec<ExtractionError>) {
        let mut items = Vec::new();
        let mut errors = Vec::new();
        if lines.is_empty() {
            return (items, errors);
        }

        let document_context = self.document_context(lines);

        for block in &self.blocks {
            let Some(recipe) = &block.recipe else { continue };
            for (start, end) in block.ranges(lines) {
                match recipe.parse(source, lines, (start, end), &document_context, format, date_formats) {
                    Ok(Some(item)) => items.push(item),
                    Ok(None) => log::debug!("{}: block at line {} skipped", source, start + 1),
                    Err(e) => {
                        log::warn!("{}: block at lines {}-{} failed: {}", source, start + 1, end + 1, e);
                        errors.push(ExtractionError::Block {
                            document: source.to_string(),
                            start: start + 1,
                            end: end + 1,
                            reason: e.to_string(),
                            raw_text: lines[start..=end].join("\n"),
                        });
                    }
                }
            }
        }

        (items, errors)
    }
}

fn compile(pattern: &str) -> Result<Regex, GrammarError> {
    Regex::new(pattern).map_err(|e| GrammarError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

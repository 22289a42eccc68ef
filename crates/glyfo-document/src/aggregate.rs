// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result aggregator — collects finished pages into write-once slots and
// emits them in page-number order.

use std::collections::BTreeMap;

use glyfo_core::{GlyfoError, Page, PageClass, Result, TextRegion};
use tracing::debug;

use crate::pdf::reader::PageGeometry;

/// Regions gathered for one page before it is sealed.
#[derive(Debug)]
pub struct PageDraft {
    page_num: u32,
    geometry: PageGeometry,
    page_type: PageClass,
    native: Vec<TextRegion>,
    ocr: Vec<TextRegion>,
}

impl PageDraft {
    pub fn new(page_num: u32, geometry: PageGeometry, page_type: PageClass) -> Self {
        Self {
            page_num,
            geometry,
            page_type,
            native: Vec::new(),
            ocr: Vec::new(),
        }
    }

    pub fn page_num(&self) -> u32 {
        self.page_num
    }

    pub fn page_type(&self) -> PageClass {
        self.page_type
    }

    /// Reclassify, e.g. after the text layer turned out to be unreadable.
    pub fn set_page_type(&mut self, page_type: PageClass) {
        self.page_type = page_type;
    }

    pub fn push_native(&mut self, regions: impl IntoIterator<Item = TextRegion>) {
        self.native.extend(regions);
    }

    pub fn push_ocr(&mut self, regions: impl IntoIterator<Item = TextRegion>) {
        self.ocr.extend(regions);
    }

    /// Native regions first, then OCR regions, each in arrival order.
    pub fn into_regions(self) -> Vec<TextRegion> {
        let mut regions = self.native;
        regions.extend(self.ocr);
        regions
    }

    pub fn into_page(self) -> Page {
        self.into_page_with(|regions| regions)
    }

    /// Seals the page after a final pass over its regions (word splitting).
    pub fn into_page_with(self, finish: impl FnOnce(Vec<TextRegion>) -> Vec<TextRegion>) -> Page {
        let (page_num, geometry, page_type) = (self.page_num, self.geometry, self.page_type);
        Page::new(page_num, geometry.width(), geometry.height(), page_type, finish(self.into_regions()))
    }
}

/// One slot per expected page; each is filled exactly once.
#[derive(Debug)]
pub struct ResultAggregator {
    slots: BTreeMap<u32, Option<Page>>,
}

impl ResultAggregator {
    pub fn new(page_numbers: impl IntoIterator<Item = u32>) -> Self {
        Self {
            slots: page_numbers.into_iter().map(|n| (n, None)).collect(),
        }
    }

    pub fn submit(&mut self, page: Page) -> Result<()> {
        let page_num = page.page_num();
        match self.slots.get_mut(&page_num) {
            None => Err(GlyfoError::Aggregation(format!("page {} was not expected", page_num))),
            Some(Some(_)) => Err(GlyfoError::Aggregation(format!("page {} submitted twice", page_num))),
            Some(slot) => {
                debug!(page = page_num, regions = page.text_regions().len(), "page aggregated");
                *slot = Some(page);
                Ok(())
            }
        }
    }

    /// All pages in page-number order; fails if any slot is still empty.
    pub fn finish(self) -> Result<Vec<Page>> {
        self.slots
            .into_iter()
            .map(|(page_num, slot)| {
                slot.ok_or_else(|| GlyfoError::Aggregation(format!("page {} produced no result", page_num)))
            })
            .collect()
    }
}
